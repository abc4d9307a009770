//! DNSSEC gives every signed record a chain of signatures leading back to the root's key. An
//! on-chain DNSSEC oracle checks such chains one link at a time, so a contract can trust a DNS
//! record as long as somebody submitted each link of its chain.
//!
//! This crate builds those chains and plans their submission:
//!  * [`proof::ChainBuilder`] queries a recursive resolver (through a [`query::Transport`]) and
//!    builds a [`proof::ProofChain`] from a [`anchors::TrustStore`] down to the requested RRset,
//!    or down to the signed NSEC record proving it does not exist. Every link is verified as it
//!    is added.
//!  * [`canon`] produces the canonical RRset and signed-data encodings the oracle checks
//!    signatures over, and the hash it stores.
//!  * [`oracle::OracleSync`] compares a chain against an oracle's state (through an
//!    [`oracle::OracleLedger`]) and plans the submissions, or the deletion, which bring the
//!    oracle up to date. Sending them is left to an [`oracle::Submitter`].
//!
//! Queries are blocking and use DNS over TCP, or DNS over HTTPS with the `doh` feature. Progress
//! is reported through `tracing`.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(rustdoc::private_intra_doc_links)]

pub mod rr;
pub mod ser;
pub mod canon;
pub mod validation;
pub mod anchors;
pub mod query;
pub mod proof;
pub mod oracle;
pub mod config;
pub mod error;

#[cfg(test)]
mod test;
