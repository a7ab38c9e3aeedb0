//! Topology construction.
//!
//! The builder turns a [`TopologySpec`] into entities in an
//! [`EntityRepository`]. Stages run strictly one after the other:
//!
//! 1. ISDs
//! 2. ASes (trust material deferred) and their attachment points
//! 3. Trust material for every ISD in the repository
//! 4. Links
//! 5. VPNs, bound to the attachment point of their AS
//! 6. Extra services
//! 7. Host labels (only with a [`HostnameAssigner`])
//!
//! The first failing entry aborts the build. Entities created before the
//! failure stay in the repository.

use super::types::{BuildError, BuildOptions, BuildReport, Stage};
use crate::config::{AsSpec, ExtraServiceSpec, IsdSpec, LinkSpec, TopologySpec, VpnSpec};
use crate::model::IsdId;
use crate::naming::HostnameAssigner;
use crate::repository::{EntityRepository, NewAs, RepoError};
use log::{debug, info};
use rayon::prelude::*;

fn stage_error(stage: Stage, entry: String) -> impl FnOnce(RepoError) -> BuildError {
    move |source| BuildError::Stage { stage, entry, source }
}

pub struct TopologyBuilder<'a, R: EntityRepository + ?Sized> {
    repo: &'a R,
    options: BuildOptions,
    hostnames: Option<HostnameAssigner>,
}

impl<'a, R: EntityRepository + ?Sized> TopologyBuilder<'a, R> {
    pub fn new(repo: &'a R) -> Self {
        Self {
            repo,
            options: BuildOptions::default(),
            hostnames: None,
        }
    }

    pub fn with_options(mut self, options: BuildOptions) -> Self {
        self.options = options;
        self
    }

    /// Run host naming as the last stage of [`Self::build`].
    pub fn with_hostnames(mut self, assigner: HostnameAssigner) -> Self {
        self.hostnames = Some(assigner);
        self
    }

    /// Run all stages for `spec`.
    pub fn build(&self, spec: &TopologySpec) -> Result<BuildReport, BuildError> {
        info!(
            "Building topology: {} ISDs, {} ASes, {} links, {} VPNs, {} extra services",
            spec.isds.len(),
            spec.ases.len(),
            spec.links.len(),
            spec.vpns.len(),
            spec.extra_services.len()
        );

        let mut report = BuildReport::default();
        report.isds = self.create_isds(&spec.isds)?;
        let (ases, attachment_points) = self.create_ases(&spec.ases)?;
        report.ases = ases;
        report.attachment_points = attachment_points;
        report.trust_bootstraps = self.bootstrap_trust_material()?;
        report.links = self.create_links(&spec.links)?;
        report.vpns = self.create_vpns(&spec.vpns)?;
        report.extra_services = self.create_extra_services(&spec.extra_services)?;

        if let Some(assigner) = &self.hostnames {
            report.hosts_named = assigner.assign(self.repo)?.len();
        }

        info!("Topology complete: {:?}", report);
        Ok(report)
    }

    pub fn create_isds(&self, isds: &[IsdSpec]) -> Result<usize, BuildError> {
        for isd in isds {
            self.repo
                .create_isd(isd.isd_id, &isd.label)
                .map_err(stage_error(Stage::CreateIsds, format!("ISD {} ({})", isd.isd_id, isd.label)))?;
        }
        info!("Created {} ISDs", isds.len());
        Ok(isds.len())
    }

    /// Create ASes with trust material deferred.
    ///
    /// Returns the number of ASes and of attachment points created.
    pub fn create_ases(&self, ases: &[AsSpec]) -> Result<(usize, usize), BuildError> {
        let mut attachment_points = 0;
        for as_spec in ases {
            let entry = format!("AS {} in ISD {}", as_spec.as_id, as_spec.isd_id);
            let isd = self
                .repo
                .get_isd(as_spec.isd_id)
                .map_err(stage_error(Stage::CreateAses, entry.clone()))?;

            let as_ = self
                .repo
                .create_as_with_defaults(NewAs {
                    isd_id: isd.isd_id,
                    as_id: as_spec.as_id.clone(),
                    label: as_spec.label.clone(),
                    is_core: as_spec.is_core,
                    public_ip: as_spec.public_ip.clone(),
                    owner: None,
                    defer_trust_init: true,
                })
                .map_err(stage_error(Stage::CreateAses, entry.clone()))?;
            debug!("Created AS {} ({}){}", as_.as_id, as_.label, if as_.is_core { " [core]" } else { "" });

            if as_spec.is_attachment_point {
                self.repo
                    .create_attachment_point(&as_.as_id)
                    .map_err(stage_error(Stage::CreateAses, entry))?;
                attachment_points += 1;
            }
        }
        info!("Created {} ASes, {} attachment points", ases.len(), attachment_points);
        Ok((ases.len(), attachment_points))
    }

    /// Generate trust material once for every ISD in the repository.
    ///
    /// Must run after all ASes exist so that TRC and certificate versions
    /// start at 1 and cover the full AS set of each ISD.
    pub fn bootstrap_trust_material(&self) -> Result<usize, BuildError> {
        let isds = self.repo.list_isds();
        let update = |isd_id: IsdId| {
            self.repo
                .update_trust_material(isd_id)
                .map(|isd| debug!("ISD {} at TRC version {}", isd.isd_id, isd.trc_version))
                .map_err(stage_error(Stage::BootstrapTrust, format!("ISD {}", isd_id)))
        };

        if self.options.parallel_trust_bootstrap {
            isds.par_iter().try_for_each(|isd| update(isd.isd_id))?;
        } else {
            isds.iter().try_for_each(|isd| update(isd.isd_id))?;
        }
        info!("Bootstrapped trust material for {} ISDs", isds.len());
        Ok(isds.len())
    }

    /// Create links. For provider links the first AS is the provider.
    pub fn create_links(&self, links: &[LinkSpec]) -> Result<usize, BuildError> {
        for link in links {
            let entry = format!("{} link {} -> {}", link.link_type, link.as_id_a, link.as_id_b);
            let as_a = self
                .repo
                .get_as(&link.as_id_a)
                .map_err(stage_error(Stage::CreateLinks, entry.clone()))?;
            let as_b = self
                .repo
                .get_as(&link.as_id_b)
                .map_err(stage_error(Stage::CreateLinks, entry.clone()))?;
            self.repo
                .create_link(link.link_type, &as_a.as_id, &as_b.as_id)
                .map_err(stage_error(Stage::CreateLinks, entry))?;
        }
        info!("Created {} links", links.len());
        Ok(links.len())
    }

    /// Create VPN servers and attach each to its AS's attachment point.
    pub fn create_vpns(&self, vpns: &[VpnSpec]) -> Result<usize, BuildError> {
        for vpn_spec in vpns {
            let err = stage_error(Stage::CreateVpns, format!("VPN on AS {}", vpn_spec.as_id));
            let as_ = match self.repo.get_as(&vpn_spec.as_id) {
                Ok(as_) => as_,
                Err(e) => return Err(err(e)),
            };
            let result = self.repo.get_sole_host(&as_.as_id).and_then(|server| {
                let vpn = self.repo.create_vpn(
                    server.id,
                    &vpn_spec.vpn_ip,
                    vpn_spec.vpn_port,
                    &vpn_spec.subnet,
                )?;
                let mut ap = self.repo.get_attachment_point(&as_.as_id)?;
                ap.vpn_id = Some(vpn.id);
                self.repo.save_attachment_point(&ap)
            });
            result.map_err(err)?;
        }
        info!("Created {} VPNs", vpns.len());
        Ok(vpns.len())
    }

    pub fn create_extra_services(&self, services: &[ExtraServiceSpec]) -> Result<usize, BuildError> {
        for service in services {
            let entry = format!("{} service on AS {}", service.service_type, service.as_id);
            let host = self
                .repo
                .get_sole_host(&service.as_id)
                .map_err(stage_error(Stage::CreateExtraServices, entry.clone()))?;
            self.repo
                .create_service(host.id, &service.as_id, service.service_type)
                .map_err(stage_error(Stage::CreateExtraServices, entry))?;
        }
        info!("Created {} extra services", services.len());
        Ok(services.len())
    }
}
