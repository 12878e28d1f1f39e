//! Known Hedera network environments.

use p402::networks::NetworkInfo;

/// The Hedera chain namespace.
pub const HEDERA_NAMESPACE: &str = "hedera";

/// Known Hedera environments for [`p402::networks::NetworkRegistry`].
pub const HEDERA_NETWORKS: &[NetworkInfo] = &[
    NetworkInfo {
        name: "hedera",
        namespace: HEDERA_NAMESPACE,
        reference: "mainnet",
    },
    NetworkInfo {
        name: "hedera-testnet",
        namespace: HEDERA_NAMESPACE,
        reference: "testnet",
    },
    NetworkInfo {
        name: "hedera-previewnet",
        namespace: HEDERA_NAMESPACE,
        reference: "previewnet",
    },
];
