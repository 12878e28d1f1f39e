//! Known TON network environments.

use p402::networks::NetworkInfo;

/// The TON chain namespace.
pub const TON_NAMESPACE: &str = "ton";

/// Known TON environments for [`p402::networks::NetworkRegistry`].
pub const TON_NETWORKS: &[NetworkInfo] = &[
    NetworkInfo {
        name: "ton",
        namespace: TON_NAMESPACE,
        reference: "mainnet",
    },
    NetworkInfo {
        name: "ton-testnet",
        namespace: TON_NAMESPACE,
        reference: "testnet",
    },
];
