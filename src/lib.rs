//! # sciontopo - Deterministic builder for SCIONLab test topologies
//!
//! This library constructs a referentially consistent SCION topology (ISDs,
//! ASes, links, attachment points, VPNs and services) in an entity
//! repository from a declarative description.
//!
//! ## Overview
//!
//! Topology construction has ordering constraints that are easy to get
//! wrong: ASes need their ISD, links need both ASes, VPNs need an attachment
//! point, and trust material (TRCs and AS certificates) must only be
//! generated once all ASes of an ISD exist, so that versions start at 1.
//! The builder encodes that order once and fails fast on the first entry
//! that references something missing.
//!
//! ## Architecture
//!
//! - `utils`: AS identifier expansion and topology validation
//! - `config`: Declarative topology description and the built-in test topology
//! - `config_loader`: YAML topology files
//! - `model`: Entity records
//! - `repository`: The `EntityRepository` trait and an in-memory implementation
//! - `builder`: Staged topology construction
//! - `naming`: Random, unique host labels from a word list
//!
//! ## Example Usage
//!
//! ```rust
//! use sciontopo::builder::TopologyBuilder;
//! use sciontopo::config::TopologySpec;
//! use sciontopo::naming::{HostnameAssigner, WordCorpus};
//! use sciontopo::repository::{EntityRepository, InMemoryRepository};
//!
//! let repo = InMemoryRepository::new();
//! let corpus = WordCorpus::from_words(["otter", "walrus", "heron", "lynx"]);
//!
//! let report = TopologyBuilder::new(&repo)
//!     .with_hostnames(HostnameAssigner::new(corpus).with_seed(1))
//!     .build(&TopologySpec::testtopo())?;
//!
//! assert_eq!(report.ases, 3);
//! assert_eq!(repo.get_isd(16)?.trc_version, 1);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Topology Format
//!
//! ```yaml
//! isds:
//!   - { isd_id: 16, label: Tsinghua }
//! ases:
//!   - { isd_id: 16, as_id: 4353, label: vm-1, public_ip: "240a:a066:100:1::11", is_core: true, is_attachment_point: true }
//!   - { isd_id: 16, as_id: "ffaa:0:1102", label: vm-2, public_ip: "240a:a066:100:1::12" }
//! links:
//!   - { type: PROVIDER, as_a: 4353, as_b: 4354 }   # first AS is the provider
//! extra_services:
//!   - { as_id: 4353, service_type: SIG }
//! ```
//!
//! ## Error Handling
//!
//! Library functions return `thiserror` enums (`RepoError`, `BuildError`,
//! `NamingError`, `ConfigError`). The binary reports them through
//! `color_eyre`.

pub mod builder;
pub mod config;
pub mod config_loader;
pub mod model;
pub mod naming;
pub mod repository;
pub mod utils;
