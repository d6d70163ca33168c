//! Static chain metadata keyed by the configured network name.

use alloy_primitives::B256;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Network {
    Ethereum,
    #[default]
    EthereumSepolia,
    Polygon,
    PolygonAmoy,
    Base,
    BaseSepolia,
    EtherlinkTestnet,
}

pub const ALL_NETWORKS: [Network; 7] = [
    Network::Ethereum,
    Network::EthereumSepolia,
    Network::Polygon,
    Network::PolygonAmoy,
    Network::Base,
    Network::BaseSepolia,
    Network::EtherlinkTestnet,
];

impl Network {
    pub fn from_name(name: &str) -> Option<Self> {
        ALL_NETWORKS
            .into_iter()
            .find(|n| n.as_str().eq_ignore_ascii_case(name.trim()))
    }

    /// Resolve a configured name, falling back to the default network when it
    /// is missing or unknown.
    pub fn resolve(name: Option<&str>) -> Self {
        match name {
            Some(raw) => Self::from_name(raw).unwrap_or_else(|| {
                log::warn!(
                    "[Network] unknown network {:?}, falling back to {}",
                    raw,
                    Self::default().as_str()
                );
                Self::default()
            }),
            None => Self::default(),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ethereum => "ethereum",
            Self::EthereumSepolia => "ethereum-sepolia",
            Self::Polygon => "polygon",
            Self::PolygonAmoy => "polygon-amoy",
            Self::Base => "base",
            Self::BaseSepolia => "base-sepolia",
            Self::EtherlinkTestnet => "etherlink-testnet",
        }
    }

    pub fn chain_id(self) -> u64 {
        match self {
            Self::Ethereum => 1,
            Self::EthereumSepolia => 11_155_111,
            Self::Polygon => 137,
            Self::PolygonAmoy => 80_002,
            Self::Base => 8_453,
            Self::BaseSepolia => 84_532,
            Self::EtherlinkTestnet => 128_123,
        }
    }

    pub fn rpc_url(self) -> &'static str {
        match self {
            Self::Ethereum => "https://ethereum-rpc.publicnode.com",
            Self::EthereumSepolia => "https://ethereum-sepolia-rpc.publicnode.com",
            Self::Polygon => "https://polygon-rpc.com",
            Self::PolygonAmoy => "https://rpc-amoy.polygon.technology",
            Self::Base => "https://mainnet.base.org",
            Self::BaseSepolia => "https://sepolia.base.org",
            Self::EtherlinkTestnet => "https://node.ghostnet.etherlink.com",
        }
    }

    /// Human-readable name for status lines.
    pub fn name(self) -> &'static str {
        match self {
            Self::Ethereum => "Ethereum",
            Self::EthereumSepolia => "Ethereum (Sepolia)",
            Self::Polygon => "Polygon (Mainnet)",
            Self::PolygonAmoy => "Polygon (Amoy)",
            Self::Base => "Base (Mainnet)",
            Self::BaseSepolia => "Base (Sepolia)",
            Self::EtherlinkTestnet => "Etherlink (Testnet)",
        }
    }

    pub fn token(self) -> &'static str {
        match self {
            Self::Polygon | Self::PolygonAmoy => "POL",
            Self::EtherlinkTestnet => "XTZ",
            _ => "ETH",
        }
    }

    pub fn faucet_url(self) -> Option<&'static str> {
        match self {
            Self::EthereumSepolia => Some("https://sepoliafaucet.com/"),
            Self::PolygonAmoy => Some("https://faucet.polygon.technology/"),
            Self::BaseSepolia => Some("https://www.alchemy.com/faucets/base-sepolia"),
            Self::EtherlinkTestnet => Some("https://faucet.etherlink.com/"),
            Self::Ethereum | Self::Polygon | Self::Base => None,
        }
    }

    pub fn block_explorer(self) -> &'static str {
        match self {
            Self::Ethereum => "https://etherscan.io",
            Self::EthereumSepolia => "https://sepolia.etherscan.io",
            Self::Polygon => "https://polygonscan.com",
            Self::PolygonAmoy => "https://amoy.polygonscan.com",
            Self::Base => "https://basescan.org",
            Self::BaseSepolia => "https://sepolia.basescan.org",
            Self::EtherlinkTestnet => "https://testnet.explorer.etherlink.com",
        }
    }

    pub fn explorer_tx_url(self, hash: B256) -> String {
        format!("{}/tx/{hash:#x}", self.block_explorer())
    }

    /// Chains without EIP-1559 need an explicit legacy `gasPrice`.
    pub fn is_eip1559_supported(self) -> bool {
        !matches!(self, Self::EtherlinkTestnet)
    }

    /// Chain segment used in bundler/paymaster relay URLs. `None` means the
    /// relay does not serve this chain and no smart account is available.
    pub fn relay_slug(self) -> Option<&'static str> {
        match self {
            Self::Ethereum => Some("ethereum"),
            Self::EthereumSepolia => Some("sepolia"),
            Self::Polygon => Some("polygon"),
            Self::PolygonAmoy => Some("amoy"),
            Self::Base => Some("base"),
            Self::BaseSepolia => Some("base-sepolia"),
            Self::EtherlinkTestnet => None,
        }
    }
}
