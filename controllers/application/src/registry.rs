//! Ordered table of managed kinds.
//!
//! The reconciler walks this table once per pass. Order matters: the
//! workload comes first, then its Service, ServiceAccount and Ingress.

use crate::{correction, drift, generators};
use cluster_client::{ManagedKind, ManagedObject};
use crds::Specification;

/// Generator, drift detector and corrective merge for one kind.
#[derive(Clone, Copy)]
pub struct KindEntry {
    /// Kind this entry produces
    pub kind: ManagedKind,
    /// Builds the desired object from the resolved specification
    pub generate: fn(&Specification) -> ManagedObject,
    /// True when the observed object differs on an allow-listed field
    pub detect_drift: fn(&ManagedObject, &ManagedObject) -> bool,
    /// Copies the allow-listed fields of the desired object onto the observed one
    pub apply_desired: fn(&ManagedObject, &mut ManagedObject),
}

impl std::fmt::Debug for KindEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KindEntry").field("kind", &self.kind).finish()
    }
}

impl KindEntry {
    fn new(kind: ManagedKind, generate: fn(&Specification) -> ManagedObject) -> Self {
        Self {
            kind,
            generate,
            detect_drift: drift::detect,
            apply_desired: correction::apply,
        }
    }
}

/// Managed kinds in reconciliation order
#[derive(Debug, Clone)]
pub struct KindRegistry {
    entries: Vec<KindEntry>,
}

impl KindRegistry {
    /// Deployment, Service, ServiceAccount and, when enabled, Ingress.
    pub fn standard(manage_ingress: bool) -> Self {
        let mut entries = vec![
            KindEntry::new(ManagedKind::Deployment, generators::deployment),
            KindEntry::new(ManagedKind::Service, generators::service),
            KindEntry::new(ManagedKind::ServiceAccount, generators::service_account),
        ];
        if manage_ingress {
            entries.push(KindEntry::new(ManagedKind::Ingress, generators::ingress));
        }
        Self { entries }
    }

    /// Entries in reconciliation order
    pub fn entries(&self) -> &[KindEntry] {
        &self.entries
    }

    /// Managed kinds in reconciliation order
    pub fn kinds(&self) -> Vec<ManagedKind> {
        self.entries.iter().map(|e| e.kind).collect()
    }
}
