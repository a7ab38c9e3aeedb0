//! End-to-end tests building the stock test topology against an
//! instrumented repository that records every write.

use parking_lot::Mutex;
use std::collections::HashSet;
use std::io::Write;
use tempfile::NamedTempFile;

use sciontopo::builder::{BuildOptions, Stage, TopologyBuilder};
use sciontopo::config::{make_as_spec, make_link_spec, make_vpn_spec, IsdSpec, TopologySpec};
use sciontopo::config_loader::load_topology;
use sciontopo::model::{
    As, AttachmentPoint, EntityId, Host, Isd, IsdId, Link, LinkType, Service, ServiceType, Vpn,
};
use sciontopo::naming::{HostnameAssigner, NamingError, WordCorpus};
use sciontopo::repository::{
    EntityRepository, HostFilter, InMemoryRepository, NewAs, RepoError, RepoResult,
};
use sciontopo::repository::memory::MAX_INTERFACE_ID;

/// Write operations, in the order the repository saw them
#[derive(Debug, Clone, PartialEq, Eq)]
enum Op {
    CreateIsd(IsdId),
    CreateAs(String, bool),
    UpdateTrust(IsdId),
    CreateAttachmentPoint(String),
    SaveAttachmentPoint(String),
    CreateLink(String, String),
    CreateVpn(EntityId),
    CreateService(String, ServiceType),
    SaveHost(EntityId),
}

#[derive(Default)]
struct RecordingRepository {
    inner: InMemoryRepository,
    ops: Mutex<Vec<Op>>,
}

impl RecordingRepository {
    fn record(&self, op: Op) {
        self.ops.lock().push(op);
    }

    fn ops(&self) -> Vec<Op> {
        self.ops.lock().clone()
    }

    fn position(&self, op: &Op) -> usize {
        self.ops()
            .iter()
            .position(|o| o == op)
            .unwrap_or_else(|| panic!("{:?} never happened", op))
    }
}

impl EntityRepository for RecordingRepository {
    fn create_isd(&self, isd_id: IsdId, label: &str) -> RepoResult<Isd> {
        let isd = self.inner.create_isd(isd_id, label)?;
        self.record(Op::CreateIsd(isd_id));
        Ok(isd)
    }

    fn get_isd(&self, isd_id: IsdId) -> RepoResult<Isd> {
        self.inner.get_isd(isd_id)
    }

    fn list_isds(&self) -> Vec<Isd> {
        self.inner.list_isds()
    }

    fn create_as_with_defaults(&self, new_as: NewAs) -> RepoResult<As> {
        let op = Op::CreateAs(new_as.as_id.clone(), new_as.defer_trust_init);
        let as_ = self.inner.create_as_with_defaults(new_as)?;
        self.record(op);
        Ok(as_)
    }

    fn get_as(&self, as_id: &str) -> RepoResult<As> {
        self.inner.get_as(as_id)
    }

    fn list_ases(&self) -> Vec<As> {
        self.inner.list_ases()
    }

    fn update_trust_material(&self, isd_id: IsdId) -> RepoResult<Isd> {
        let isd = self.inner.update_trust_material(isd_id)?;
        self.record(Op::UpdateTrust(isd_id));
        Ok(isd)
    }

    fn create_attachment_point(&self, as_id: &str) -> RepoResult<AttachmentPoint> {
        let ap = self.inner.create_attachment_point(as_id)?;
        self.record(Op::CreateAttachmentPoint(as_id.to_string()));
        Ok(ap)
    }

    fn get_attachment_point(&self, as_id: &str) -> RepoResult<AttachmentPoint> {
        self.inner.get_attachment_point(as_id)
    }

    fn save_attachment_point(&self, attachment_point: &AttachmentPoint) -> RepoResult<AttachmentPoint> {
        let ap = self.inner.save_attachment_point(attachment_point)?;
        self.record(Op::SaveAttachmentPoint(ap.as_id.clone()));
        Ok(ap)
    }

    fn list_attachment_points(&self) -> Vec<AttachmentPoint> {
        self.inner.list_attachment_points()
    }

    fn create_link(&self, link_type: LinkType, as_id_a: &str, as_id_b: &str) -> RepoResult<Link> {
        let link = self.inner.create_link(link_type, as_id_a, as_id_b)?;
        self.record(Op::CreateLink(as_id_a.to_string(), as_id_b.to_string()));
        Ok(link)
    }

    fn list_links(&self) -> Vec<Link> {
        self.inner.list_links()
    }

    fn get_sole_host(&self, as_id: &str) -> RepoResult<Host> {
        self.inner.get_sole_host(as_id)
    }

    fn list_hosts(&self, filter: HostFilter) -> Vec<Host> {
        self.inner.list_hosts(filter)
    }

    fn save_host(&self, host: &Host) -> RepoResult<Host> {
        let host = self.inner.save_host(host)?;
        self.record(Op::SaveHost(host.id));
        Ok(host)
    }

    fn create_vpn(
        &self,
        server_host_id: EntityId,
        server_vpn_ip: &str,
        server_port: u16,
        subnet: &str,
    ) -> RepoResult<Vpn> {
        let vpn = self.inner.create_vpn(server_host_id, server_vpn_ip, server_port, subnet)?;
        self.record(Op::CreateVpn(vpn.id));
        Ok(vpn)
    }

    fn list_vpns(&self) -> Vec<Vpn> {
        self.inner.list_vpns()
    }

    fn create_service(
        &self,
        host_id: EntityId,
        as_id: &str,
        service_type: ServiceType,
    ) -> RepoResult<Service> {
        let service = self.inner.create_service(host_id, as_id, service_type)?;
        self.record(Op::CreateService(as_id.to_string(), service_type));
        Ok(service)
    }

    fn list_services(&self, as_id: &str) -> Vec<Service> {
        self.inner.list_services(as_id)
    }
}

fn corpus() -> WordCorpus {
    WordCorpus::from_words([
        "otter", "walrus", "heron", "lynx", "badger", "marten", "stoat", "ibex",
    ])
}

fn build_testtopo() -> RecordingRepository {
    let repo = RecordingRepository::default();
    TopologyBuilder::new(&repo)
        .with_hostnames(HostnameAssigner::new(corpus()).with_seed(16))
        .build(&TopologySpec::testtopo())
        .unwrap();
    repo
}

#[test]
fn test_testtopo_end_to_end() {
    let repo = build_testtopo();

    let isds = repo.list_isds();
    assert_eq!(isds.len(), 1);
    assert_eq!(isds[0].isd_id, 16);
    assert_eq!(isds[0].trc_version, 1);

    let ases = repo.list_ases();
    let ids: Vec<&str> = ases.iter().map(|a| a.as_id.as_str()).collect();
    assert_eq!(ids, vec!["ffaa:0:1101", "ffaa:0:1102", "ffaa:0:1103"]);
    assert!(ases.iter().all(|a| a.certificate_version == 1 && a.trust_deferred));
    assert!(ases[0].is_core);
    assert!(!ases[1].is_core && !ases[2].is_core);

    let links = repo.list_links();
    assert_eq!(links.len(), 2);
    assert!(links.iter().all(|l| l.link_type == LinkType::Provider));
    assert!(links.iter().all(|l| l.provider() == Some("ffaa:0:1101")));
    let customers: HashSet<&str> = links.iter().filter_map(|l| l.customer()).collect();
    assert_eq!(customers, HashSet::from(["ffaa:0:1102", "ffaa:0:1103"]));

    let aps = repo.list_attachment_points();
    assert_eq!(aps.len(), 1);
    assert_eq!(aps[0].as_id, "ffaa:0:1101");
    assert_eq!(aps[0].vpn_id, None);

    let services: Vec<ServiceType> =
        repo.list_services("ffaa:0:1101").iter().map(|s| s.service_type).collect();
    assert_eq!(services.len(), 4);
    assert!(services.contains(&ServiceType::IpGateway));
    assert_eq!(repo.list_services("ffaa:0:1102").len(), 3);

    let hosts = repo.list_hosts(HostFilter::Infrastructure);
    assert_eq!(hosts.len(), 3);
    let labels: HashSet<String> = hosts.iter().filter_map(|h| h.label.clone()).collect();
    assert_eq!(labels.len(), 3);
    for host in &hosts {
        let label = host.label.as_deref().unwrap();
        let suffix = host.as_id.rsplit(':').next().unwrap();
        assert!(label.starts_with(&format!("scionlab-{}-", suffix)), "{}", label);
    }
}

#[test]
fn test_every_as_references_a_created_isd() {
    let repo = build_testtopo();
    let created_isds: HashSet<IsdId> = repo
        .ops()
        .iter()
        .filter_map(|op| match op {
            Op::CreateIsd(id) => Some(*id),
            _ => None,
        })
        .collect();
    for as_ in repo.list_ases() {
        assert!(created_isds.contains(&as_.isd_id));
        assert!(repo.position(&Op::CreateIsd(as_.isd_id)) < repo.position(&Op::CreateAs(as_.as_id.clone(), true)));
    }
}

#[test]
fn test_link_endpoints_exist_before_link() {
    let repo = build_testtopo();
    for link in repo.list_links() {
        let a = &link.interface_a.as_id;
        let b = &link.interface_b.as_id;
        let link_pos = repo.position(&Op::CreateLink(a.clone(), b.clone()));
        assert!(repo.position(&Op::CreateAs(a.clone(), true)) < link_pos);
        assert!(repo.position(&Op::CreateAs(b.clone(), true)) < link_pos);

        assert!(repo.get_as(a).unwrap().created.seq < link.created.seq);
        assert!(repo.get_as(b).unwrap().created.seq < link.created.seq);
    }
}

#[test]
fn test_trust_bootstrap_once_per_isd_after_all_ases() {
    let repo = RecordingRepository::default();
    let mut spec = TopologySpec::testtopo();
    spec.isds.push(IsdSpec::new(17, "Switzerland"));
    spec.ases.push(make_as_spec(17, 0x1107, "ethz", "10.0.17.1", true, false));
    spec.ases.push(make_as_spec(16, 0x1104, "vm-4", "10.0.16.4", false, false));

    TopologyBuilder::new(&repo).build(&spec).unwrap();

    let ops = repo.ops();
    let last_as = ops.iter().rposition(|op| matches!(op, Op::CreateAs(..))).unwrap();
    let updates: Vec<(usize, IsdId)> = ops
        .iter()
        .enumerate()
        .filter_map(|(i, op)| match op {
            Op::UpdateTrust(id) => Some((i, *id)),
            _ => None,
        })
        .collect();

    assert_eq!(updates.iter().map(|(_, id)| *id).collect::<Vec<_>>(), vec![16, 17]);
    assert!(updates.iter().all(|(i, _)| *i > last_as));
    assert!(ops.iter().all(|op| !matches!(op, Op::CreateAs(_, false))));

    for isd in repo.list_isds() {
        assert_eq!(isd.trc_version, 1);
    }
    assert!(repo.list_ases().iter().all(|a| a.certificate_version == 1));
}

#[test]
fn test_parallel_bootstrap_matches_sequential() {
    let repo = RecordingRepository::default();
    let mut spec = TopologySpec::testtopo();
    spec.isds.push(IsdSpec::new(17, "Switzerland"));
    spec.ases.push(make_as_spec(17, 0x1107, "ethz", "10.0.17.1", true, false));

    TopologyBuilder::new(&repo)
        .with_options(BuildOptions { parallel_trust_bootstrap: true })
        .build(&spec)
        .unwrap();

    let updates: HashSet<IsdId> = repo
        .ops()
        .iter()
        .filter_map(|op| match op {
            Op::UpdateTrust(id) => Some(*id),
            _ => None,
        })
        .collect();
    assert_eq!(updates, HashSet::from([16, 17]));
    assert!(repo.list_isds().iter().all(|isd| isd.trc_version == 1));
}

#[test]
fn test_second_run_fails_with_duplicate_key() {
    let repo = build_testtopo();
    let ops_before = repo.ops().len();

    let err = TopologyBuilder::new(&repo)
        .build(&TopologySpec::testtopo())
        .unwrap_err();
    assert_eq!(err.stage(), Stage::CreateIsds);
    assert!(err.repo_error().is_some_and(|e| e.is_duplicate_key()));
    assert_eq!(repo.ops().len(), ops_before);
}

#[test]
fn test_duplicate_as_in_one_topology() {
    let repo = RecordingRepository::default();
    let mut spec = TopologySpec::testtopo();
    spec.ases.push(make_as_spec(16, 0x1102, "vm-2-again", "240a:a066:100:1::22", false, false));

    let err = TopologyBuilder::new(&repo).build(&spec).unwrap_err();
    assert_eq!(err.stage(), Stage::CreateAses);
    assert!(err.repo_error().is_some_and(|e| e.is_duplicate_key()));
    assert!(err.to_string().contains("AS ffaa:0:1102"));

    // The first entry stands and trust bootstrap never ran.
    assert_eq!(repo.get_as("ffaa:0:1102").unwrap().label, "vm-2");
    assert!(!repo.ops().iter().any(|op| matches!(op, Op::UpdateTrust(_))));
}

#[test]
fn test_interface_exhaustion_fails_links_stage() {
    let repo = InMemoryRepository::new();
    let mut spec = TopologySpec::testtopo();
    spec.links = (0..=MAX_INTERFACE_ID)
        .map(|_| make_link_spec(LinkType::Peer, 0x1102, 0x1103))
        .collect();

    let err = TopologyBuilder::new(&repo).build(&spec).unwrap_err();
    assert_eq!(err.stage(), Stage::CreateLinks);
    assert!(matches!(err.repo_error(), Some(RepoError::Exhausted { .. })), "{:?}", err);
    assert_eq!(repo.list_links().len(), usize::from(MAX_INTERFACE_ID));

    let last = repo.list_links().pop().unwrap();
    assert_eq!(last.interface_a.public_port, u16::MAX);
}

#[test]
fn test_vpn_requires_attachment_point() {
    let repo = RecordingRepository::default();
    let mut spec = TopologySpec::testtopo();
    spec.vpns.push(make_vpn_spec(0x1101, "10.0.8.1", 1194, "10.0.8.0/24"));
    spec.vpns.push(make_vpn_spec(0x1103, "10.0.9.1", 1194, "10.0.9.0/24"));

    let err = TopologyBuilder::new(&repo).build(&spec).unwrap_err();
    assert_eq!(err.stage(), Stage::CreateVpns);
    assert!(err.repo_error().is_some_and(|e| e.is_not_found()));
    assert!(err.to_string().contains("VPN on AS ffaa:0:1103"));

    // The first VPN went through and was bound before the failure.
    let ap = repo.get_attachment_point("ffaa:0:1101").unwrap();
    assert!(ap.vpn_id.is_some());
    assert!(repo.ops().contains(&Op::SaveAttachmentPoint("ffaa:0:1101".to_string())));
    // Extra services never ran.
    assert_eq!(repo.list_services("ffaa:0:1101").len(), 3);
}

#[test]
fn test_provider_follows_argument_order() {
    let repo = RecordingRepository::default();
    let mut spec = TopologySpec::testtopo();
    spec.links = vec![
        make_link_spec(LinkType::Provider, 0x1102, 0x1103),
        make_link_spec(LinkType::Provider, 0x1103, 0x1102),
    ];

    TopologyBuilder::new(&repo).build(&spec).unwrap();
    let providers: Vec<Option<String>> = repo
        .list_links()
        .iter()
        .map(|l| l.provider().map(str::to_string))
        .collect();
    assert_eq!(
        providers,
        vec![Some("ffaa:0:1102".to_string()), Some("ffaa:0:1103".to_string())]
    );
}

#[test]
fn test_insufficient_corpus_aborts_naming() {
    let repo = RecordingRepository::default();
    let err = TopologyBuilder::new(&repo)
        .with_hostnames(HostnameAssigner::new(WordCorpus::from_words(["otter", "walrus"])))
        .build(&TopologySpec::testtopo())
        .unwrap_err();

    assert_eq!(err.stage(), Stage::NameHosts);
    assert!(err.to_string().contains("2 usable words, 3 hosts"));
    assert!(repo.ops().iter().all(|op| !matches!(op, Op::SaveHost(_))));
    // Everything before naming is in place.
    assert_eq!(repo.list_links().len(), 2);
    assert_eq!(repo.list_services("ffaa:0:1101").len(), 4);
}

#[test]
fn test_seeded_naming_is_reproducible() {
    let first = build_testtopo();
    let second = build_testtopo();
    let labels = |repo: &RecordingRepository| -> Vec<Option<String>> {
        repo.list_hosts(HostFilter::All).into_iter().map(|h| h.label).collect()
    };
    assert_eq!(labels(&first), labels(&second));
}

#[test]
fn test_build_from_topology_file() {
    let yaml = r#"
isds:
  - { isd_id: 16, label: Tsinghua }
ases:
  - { isd_id: 16, as_id: 4353, label: vm-1, public_ip: "240a:a066:100:1::11", is_core: true, is_attachment_point: true }
  - { isd_id: 16, as_id: 4354, label: vm-2, public_ip: "240a:a066:100:1::12" }
links:
  - { type: PROVIDER, as_a: 4353, as_b: 4354 }
vpns:
  - { as_id: 4353, vpn_ip: 10.0.8.1, vpn_port: 1194, subnet: 10.0.8.0/24 }
extra_services:
  - { as_id: 4354, service_type: PP }
"#;
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "{}", yaml).unwrap();
    let spec = load_topology(file.path()).unwrap();

    let repo = InMemoryRepository::new();
    let report = TopologyBuilder::new(&repo)
        .with_hostnames(HostnameAssigner::new(corpus()))
        .build(&spec)
        .unwrap();

    assert_eq!(report.ases, 2);
    assert_eq!(report.vpns, 1);
    assert_eq!(report.hosts_named, 2);

    let snapshot = repo.snapshot();
    assert_eq!(snapshot.attachment_points[0].vpn_id, Some(snapshot.vpns[0].id));
    assert!(snapshot
        .services
        .iter()
        .any(|s| s.as_id == "ffaa:0:1102" && s.service_type == ServiceType::PingPong));
}

#[test]
fn test_naming_error_kind() {
    let repo = InMemoryRepository::new();
    TopologyBuilder::new(&repo).build(&TopologySpec::testtopo()).unwrap();
    let err = HostnameAssigner::new(WordCorpus::default()).assign(&repo).unwrap_err();
    assert!(matches!(err, NamingError::InsufficientCorpus { available: 0, required: 3 }));
}
