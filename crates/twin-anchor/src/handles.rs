//! Ledger client handles built once at startup

use std::sync::Arc;
use std::time::Duration;

use crate::backend::{LedgerQuery, CARDANO, MIDNIGHT};
use crate::chain::{ChainClient, HttpChainClient};
use crate::config::AnchorConfig;
use crate::error::ConfigError;
use crate::index::{MemoryRootIndex, RootIndex};
use crate::private::PrivateAnchorBuilder;
use crate::public::{PublicAnchorBuilder, PublicSubmitter};
use crate::sealing::PayloadSealer;
use crate::service::AnchorService;
use crate::shielded::{RealShieldedBackend, ShieldedBackend};
use crate::simulator::{FallbackSimulator, SimulatedBackend};
use crate::strategy::{choose_strategy, Strategy};
use crate::verifier::AnchorVerifier;
use crate::wallet::Wallet;

/// Everything the anchoring flow needs, resolved from configuration
#[derive(Clone)]
pub struct LedgerHandles {
    pub public_builder: PublicAnchorBuilder,
    pub private_builder: PrivateAnchorBuilder,
    pub public_query: Arc<dyn LedgerQuery>,
    pub private_query: Arc<dyn LedgerQuery>,
    pub index: Arc<dyn RootIndex>,
    pub min_confirmations: u64,
    pub call_timeout: Duration,
}

impl LedgerHandles {
    /// Resolve strategies and construct clients.
    ///
    /// Anything a real strategy needs but the configuration lacks is an error
    /// here, never at request time.
    pub fn from_config(config: &AnchorConfig) -> Result<Self, ConfigError> {
        let simulator = FallbackSimulator::system();
        let timeout = config.call_timeout;

        let public_strategy = choose_strategy(&config.public.settings);
        let (public_builder, public_query): (PublicAnchorBuilder, Arc<dyn LedgerQuery>) =
            match public_strategy {
                Strategy::Real => {
                    let public = &config.public;
                    let url = public
                        .settings
                        .endpoint
                        .as_deref()
                        .ok_or_else(|| ConfigError::Missing("TWIN_CARDANO_GATEWAY_URL".into()))?;
                    let address = public
                        .address
                        .as_deref()
                        .ok_or_else(|| ConfigError::Missing("TWIN_CARDANO_ADDRESS".into()))?;
                    let seed = public.wallet_seed.as_ref().ok_or_else(|| {
                        ConfigError::Missing("TWIN_WALLET_SEED_FILE or TWIN_WALLET_SEED_HEX".into())
                    })?;
                    let wallet = Arc::new(Wallet::from_provider(address, seed)?);
                    let client = Arc::new(
                        HttpChainClient::new(url, public.project_id.clone(), timeout)
                            .map_err(|e| ConfigError::Client(e.to_string()))?,
                    );
                    let chain: Arc<dyn ChainClient> = client.clone();
                    let builder = PublicAnchorBuilder::new(
                        PublicSubmitter::Chain {
                            client: chain,
                            wallet,
                        },
                        simulator.clone(),
                    )
                    .with_fallback(public.settings.fallback)
                    .with_max_metadata_bytes(public.max_metadata_bytes)
                    .with_min_utxo(public.min_utxo)
                    .with_call_timeout(timeout);
                    let query: Arc<dyn LedgerQuery> = client;
                    (builder, query)
                }
                Strategy::Simulated => {
                    let query: Arc<dyn LedgerQuery> =
                        Arc::new(SimulatedBackend::new(CARDANO, simulator.clone()));
                    let builder = PublicAnchorBuilder::simulated(simulator.clone())
                        .with_max_metadata_bytes(config.public.max_metadata_bytes);
                    (builder, query)
                }
            };

        let private_strategy = choose_strategy(&config.private.settings);
        let sealer = match (&config.private.sealing_key, private_strategy) {
            (Some(source), _) => PayloadSealer::from_provider(source)?,
            (None, Strategy::Real) => {
                return Err(ConfigError::Missing(
                    "TWIN_SEALING_KEY_FILE or TWIN_SEALING_KEY_HEX".into(),
                ))
            }
            (None, Strategy::Simulated) => PayloadSealer::ephemeral(),
        };
        let (shielded, private_query): (Arc<dyn ShieldedBackend>, Arc<dyn LedgerQuery>) =
            match private_strategy {
                Strategy::Real => {
                    let url = config
                        .private
                        .settings
                        .endpoint
                        .as_deref()
                        .ok_or_else(|| ConfigError::Missing("TWIN_MIDNIGHT_NODE_URL".into()))?;
                    let node = Arc::new(
                        RealShieldedBackend::new(url, config.private.auth_token.clone(), timeout)
                            .map_err(|e| ConfigError::Client(e.to_string()))?,
                    );
                    let query: Arc<dyn LedgerQuery> = node.clone();
                    let backend: Arc<dyn ShieldedBackend> = node;
                    (backend, query)
                }
                Strategy::Simulated => {
                    let sim = Arc::new(SimulatedBackend::new(MIDNIGHT, simulator.clone()));
                    let query: Arc<dyn LedgerQuery> = sim.clone();
                    let backend: Arc<dyn ShieldedBackend> = sim;
                    (backend, query)
                }
            };
        let private_builder = PrivateAnchorBuilder::new(shielded, sealer, simulator)
            .with_fallback(config.private.settings.fallback)
            .with_call_timeout(timeout);

        tracing::info!(
            public = %public_strategy,
            private = %private_strategy,
            public_fallback = config.public.settings.fallback,
            private_fallback = config.private.settings.fallback,
            "Ledger handles ready"
        );
        if public_strategy == Strategy::Simulated || private_strategy == Strategy::Simulated {
            tracing::warn!(
                fallback = true,
                "At least one ledger is simulated; its anchors will never verify"
            );
        }

        Ok(Self {
            public_builder,
            private_builder,
            public_query,
            private_query,
            index: Arc::new(MemoryRootIndex::with_capacity(config.index_capacity)),
            min_confirmations: config.min_confirmations,
            call_timeout: timeout,
        })
    }

    /// Both ledgers simulated, with an ephemeral sealing key
    pub fn simulated() -> Self {
        let simulator = FallbackSimulator::system();
        let shielded = Arc::new(SimulatedBackend::new(MIDNIGHT, simulator.clone()));
        Self {
            public_builder: PublicAnchorBuilder::simulated(simulator.clone()),
            private_builder: PrivateAnchorBuilder::new(
                shielded.clone(),
                PayloadSealer::ephemeral(),
                simulator.clone(),
            ),
            public_query: Arc::new(SimulatedBackend::new(CARDANO, simulator)),
            private_query: shielded,
            index: Arc::new(MemoryRootIndex::new()),
            min_confirmations: 1,
            call_timeout: Duration::from_secs(20),
        }
    }

    pub fn with_index(mut self, index: Arc<dyn RootIndex>) -> Self {
        self.index = index;
        self
    }

    pub fn verifier(&self) -> AnchorVerifier {
        AnchorVerifier::new(
            self.public_query.clone(),
            self.private_query.clone(),
            self.index.clone(),
        )
        .with_min_confirmations(self.min_confirmations)
        .with_call_timeout(self.call_timeout)
    }

    pub fn service(&self) -> AnchorService {
        AnchorService::new(
            self.public_builder.clone(),
            self.private_builder.clone(),
            self.index.clone(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategy::{LedgerMode, LedgerSettings};
    use crate::wallet::SecretSource;
    use zeroize::Zeroizing;

    #[test]
    fn test_default_config_builds_simulated_handles() {
        let handles = LedgerHandles::from_config(&AnchorConfig::default()).unwrap();
        assert_eq!(handles.public_query.name(), CARDANO);
        assert_eq!(handles.private_query.name(), MIDNIGHT);
    }

    #[test]
    fn test_real_public_without_wallet_fails_at_startup() {
        let mut config = AnchorConfig::default();
        config.public.settings = LedgerSettings {
            mode: LedgerMode::Auto,
            endpoint: Some("http://gateway.local".into()),
            fallback: true,
        };
        config.public.address = Some("addr_test1qz".into());
        let err = LedgerHandles::from_config(&config).err().unwrap();
        assert!(matches!(err, ConfigError::Missing(ref what) if what.contains("WALLET_SEED")));
    }

    #[test]
    fn test_real_mode_without_endpoint_fails() {
        let mut config = AnchorConfig::default();
        config.private.settings.mode = LedgerMode::Real;
        config.private.sealing_key = Some(SecretSource::Bytes(Zeroizing::new([1u8; 32])));
        let err = LedgerHandles::from_config(&config).err().unwrap();
        assert!(matches!(err, ConfigError::Missing(ref what) if what == "TWIN_MIDNIGHT_NODE_URL"));
    }

    #[test]
    fn test_real_private_requires_sealing_key() {
        let mut config = AnchorConfig::default();
        config.private.settings.endpoint = Some("http://node.local:9944".into());
        let err = LedgerHandles::from_config(&config).err().unwrap();
        assert!(matches!(err, ConfigError::Missing(ref what) if what.contains("SEALING_KEY")));
    }

    #[test]
    fn test_fully_configured_real_handles() {
        let mut config = AnchorConfig::default();
        config.public.settings.endpoint = Some("http://gateway.local".into());
        config.public.address = Some("addr_test1qz".into());
        config.public.wallet_seed = Some(SecretSource::Bytes(Zeroizing::new([2u8; 32])));
        config.private.settings.endpoint = Some("http://node.local:9944".into());
        config.private.sealing_key = Some(SecretSource::Bytes(Zeroizing::new([3u8; 32])));

        let handles = LedgerHandles::from_config(&config).unwrap();
        assert_eq!(handles.public_query.name(), CARDANO);
        assert_eq!(handles.private_query.name(), MIDNIGHT);
        assert_eq!(handles.verifier().min_confirmations(), 1);
    }
}
