use std::fmt;

/// The role a certificate plays in cluster bootstrap.
///
/// The set is closed: each purpose has a fixed generation strategy (see
/// [`crate::generate`]) and a fixed suffix used to derive its storage name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Purpose {
    /// Root CA for the cluster's serving certificates.
    ClusterCA,
    /// Root CA for client certificates.
    ClientClusterCA,
    /// Root CA for etcd.
    EtcdCA,
    /// Client certificate the API server presents to an external etcd.
    APIServerEtcdClient,
    /// Service-account token signing keys.
    ServiceAccount,
}

impl Purpose {
    /// Every purpose, in declaration order.
    pub const ALL: [Purpose; 5] = [
        Purpose::ClusterCA,
        Purpose::ClientClusterCA,
        Purpose::EtcdCA,
        Purpose::APIServerEtcdClient,
        Purpose::ServiceAccount,
    ];

    /// Suffix appended to the cluster name to form the storage name.
    pub const fn suffix(self) -> &'static str {
        match self {
            Purpose::ClusterCA => "ca",
            Purpose::ClientClusterCA => "cca",
            Purpose::EtcdCA => "etcd",
            Purpose::APIServerEtcdClient => "apiserver-etcd-client",
            Purpose::ServiceAccount => "sa",
        }
    }

    /// Material for this purpose is only ever supplied by the user.
    pub const fn is_user_supplied(self) -> bool {
        matches!(self, Purpose::APIServerEtcdClient)
    }
}

impl fmt::Display for Purpose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.suffix())
    }
}

/// Storage name of the record holding `purpose` for `cluster_name`.
pub fn name(cluster_name: &str, purpose: Purpose) -> String {
    format!("{cluster_name}-{}", purpose.suffix())
}
