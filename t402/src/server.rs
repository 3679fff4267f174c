//! t402 resource server logic.
//!
//! [`T402ResourceServer`] builds payment requirements for protected
//! resources and delegates verification and settlement to remote
//! facilitators, running lifecycle hooks around both.

use std::sync::Arc;

use serde_json::Value;
use t402_proto::helpers::matches_network_pattern;
use t402_proto::{
    PaymentPayload, PaymentRequired, PaymentRequirements, ResourceInfo, SettleResponse,
    SupportedKind, SupportedResponse, T402_VERSION, VerifyResponse,
};

use crate::amount::AssetAmount;
use crate::config::ResourceConfig;
use crate::error::{PaymentAbortedError, SchemeNotFoundError};
use crate::hooks::{
    AbortResult, RecoveredSettleResult, RecoveredVerifyResult, SettleContext,
    SettleFailureContext, SettleResultContext, VerifyContext, VerifyFailureContext,
    VerifyResultContext,
};
use crate::scheme::{BoxFuture, SchemeError, SchemeRegistry, SchemeServer};

const NOT_INITIALIZED: &str = "Server not initialized. Call initialize() first.";

/// Facilitator client used by resource servers.
///
/// The usual implementation speaks HTTP to a facilitator service; see
/// `t402_http::HttpFacilitatorClient`.
pub trait FacilitatorClient: Send + Sync {
    /// Sends a payment to the facilitator's `/verify`.
    fn verify<'a>(
        &'a self,
        payload: &'a PaymentPayload,
        requirements: &'a PaymentRequirements,
    ) -> BoxFuture<'a, Result<VerifyResponse, SchemeError>>;

    /// Settles a V2 payment.
    fn settle<'a>(
        &'a self,
        payload: &'a PaymentPayload,
        requirements: &'a PaymentRequirements,
    ) -> BoxFuture<'a, Result<SettleResponse, SchemeError>>;

    /// Returns the payment kinds the facilitator handles.
    fn get_supported(&self) -> BoxFuture<'_, Result<SupportedResponse, SchemeError>>;
}

/// Runs before `/verify`; `Some(AbortResult)` stops the request.
pub type BeforeVerifyHook =
    Box<dyn Fn(&VerifyContext) -> BoxFuture<'_, Option<AbortResult>> + Send + Sync>;

/// Observes an accepted verification.
pub type AfterVerifyHook = Box<dyn Fn(&VerifyResultContext) -> BoxFuture<'_, ()> + Send + Sync>;

/// Async hook called on verification failure. Return a result to override.
pub type OnVerifyFailureHook = Box<
    dyn Fn(&VerifyFailureContext) -> BoxFuture<'_, Option<RecoveredVerifyResult>> + Send + Sync,
>;

/// Runs before `/settle`; `Some(AbortResult)` stops the request.
pub type BeforeSettleHook =
    Box<dyn Fn(&SettleContext) -> BoxFuture<'_, Option<AbortResult>> + Send + Sync>;

/// Observes a confirmed settlement.
pub type AfterSettleHook = Box<dyn Fn(&SettleResultContext) -> BoxFuture<'_, ()> + Send + Sync>;

/// Async hook called on settlement failure. Return a result to override.
pub type OnSettleFailureHook = Box<
    dyn Fn(&SettleFailureContext) -> BoxFuture<'_, Option<RecoveredSettleResult>> + Send + Sync,
>;

/// A kind advertised by one of the facilitator clients.
#[derive(Debug, Clone)]
struct KnownKind {
    facilitator: usize,
    kind: SupportedKind,
}

/// Resource server with scheme lookup, facilitator discovery and
/// verify/settle delegation.
pub struct T402ResourceServer {
    schemes: Arc<SchemeRegistry<dyn SchemeServer>>,
    facilitator_clients: Vec<Box<dyn FacilitatorClient>>,
    kinds: Vec<KnownKind>,
    before_verify_hooks: Vec<BeforeVerifyHook>,
    after_verify_hooks: Vec<AfterVerifyHook>,
    on_verify_failure_hooks: Vec<OnVerifyFailureHook>,
    before_settle_hooks: Vec<BeforeSettleHook>,
    after_settle_hooks: Vec<AfterSettleHook>,
    on_settle_failure_hooks: Vec<OnSettleFailureHook>,
    initialized: bool,
}

impl std::fmt::Debug for T402ResourceServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("T402ResourceServer")
            .field("schemes", &self.schemes)
            .field("facilitator_clients_count", &self.facilitator_clients.len())
            .field("kinds", &self.kinds.len())
            .field("initialized", &self.initialized)
            .finish_non_exhaustive()
    }
}

impl T402ResourceServer {
    /// Creates a server backed by a server scheme registry.
    #[must_use]
    pub fn new(schemes: Arc<SchemeRegistry<dyn SchemeServer>>) -> Self {
        Self {
            schemes,
            facilitator_clients: Vec::new(),
            kinds: Vec::new(),
            before_verify_hooks: Vec::new(),
            after_verify_hooks: Vec::new(),
            on_verify_failure_hooks: Vec::new(),
            before_settle_hooks: Vec::new(),
            after_settle_hooks: Vec::new(),
            on_settle_failure_hooks: Vec::new(),
            initialized: false,
        }
    }

    /// Adds a facilitator client. Earlier clients win when several
    /// advertise the same kind.
    pub fn add_facilitator(&mut self, client: Box<dyn FacilitatorClient>) -> &mut Self {
        self.facilitator_clients.push(client);
        self
    }

    /// Returns the scheme registry.
    #[must_use]
    pub const fn schemes(&self) -> &Arc<SchemeRegistry<dyn SchemeServer>> {
        &self.schemes
    }

    /// Adds a hook run ahead of verification.
    pub fn on_before_verify(&mut self, hook: BeforeVerifyHook) -> &mut Self {
        self.before_verify_hooks.push(hook);
        self
    }

    /// Adds a hook run after a valid verification.
    pub fn on_after_verify(&mut self, hook: AfterVerifyHook) -> &mut Self {
        self.after_verify_hooks.push(hook);
        self
    }

    /// Adds a hook run when verification errors.
    pub fn on_verify_failure(&mut self, hook: OnVerifyFailureHook) -> &mut Self {
        self.on_verify_failure_hooks.push(hook);
        self
    }

    /// Adds a hook run ahead of settlement.
    pub fn on_before_settle(&mut self, hook: BeforeSettleHook) -> &mut Self {
        self.before_settle_hooks.push(hook);
        self
    }

    /// Adds a hook run after settlement succeeds.
    pub fn on_after_settle(&mut self, hook: AfterSettleHook) -> &mut Self {
        self.after_settle_hooks.push(hook);
        self
    }

    /// Adds a hook run when settlement errors.
    pub fn on_settle_failure(&mut self, hook: OnSettleFailureHook) -> &mut Self {
        self.on_settle_failure_hooks.push(hook);
        self
    }

    /// Fetches supported kinds from every facilitator client.
    ///
    /// Must be called before building requirements or delegating payments.
    ///
    /// # Errors
    ///
    /// Fails if a facilitator's `/supported` cannot be fetched.
    pub async fn initialize(&mut self) -> Result<(), SchemeError> {
        let mut kinds = Vec::new();
        for (idx, client) in self.facilitator_clients.iter().enumerate() {
            let supported = client.get_supported().await?;
            tracing::debug!(facilitator = idx, kinds = supported.kinds.len(), "fetched supported kinds");
            kinds.extend(supported.kinds.into_iter().map(|kind| KnownKind {
                facilitator: idx,
                kind,
            }));
        }
        self.kinds = kinds;
        self.initialized = true;
        Ok(())
    }

    /// Returns whether [`initialize`](Self::initialize) has completed.
    #[must_use]
    pub const fn is_initialized(&self) -> bool {
        self.initialized
    }

    fn find_kind(&self, version: u32, network: &str, scheme: &str) -> Option<&KnownKind> {
        let candidates = || {
            self.kinds
                .iter()
                .filter(move |k| k.kind.t402_version == version && k.kind.scheme == scheme)
        };
        candidates()
            .find(|k| k.kind.network == network)
            .or_else(|| candidates().find(|k| matches_network_pattern(network, &k.kind.network)))
    }

    /// Returns the facilitator's advertised kind for a version, network and
    /// scheme. Exact network kinds are preferred over wildcard kinds.
    #[must_use]
    pub fn get_supported_kind(
        &self,
        version: u32,
        network: &str,
        scheme: &str,
    ) -> Option<&SupportedKind> {
        self.find_kind(version, network, scheme).map(|k| &k.kind)
    }

    /// Turns a [`ResourceConfig`] into one requirements entry.
    ///
    /// # Errors
    ///
    /// Returns an error if the server is not initialized, no scheme or
    /// facilitator handles the network, or the price cannot be parsed.
    pub fn build_payment_requirements(
        &self,
        config: &ResourceConfig,
    ) -> Result<Vec<PaymentRequirements>, SchemeError> {
        if !self.initialized {
            return Err(NOT_INITIALIZED.into());
        }

        let not_found = || SchemeNotFoundError::new(&config.scheme, &config.network);
        let server = self
            .schemes
            .get(&config.network, &config.scheme, T402_VERSION)
            .ok_or_else(not_found)?;
        let supported_kind = self
            .get_supported_kind(T402_VERSION, &config.network, &config.scheme)
            .ok_or_else(not_found)?;

        let AssetAmount {
            amount,
            asset,
            extra,
        } = server.parse_price(&config.price, &config.network)?;

        let base = PaymentRequirements {
            scheme: config.scheme.clone(),
            network: config.network.clone(),
            asset,
            amount,
            pay_to: config.pay_to.clone(),
            max_timeout_seconds: config.max_timeout_seconds(),
            extra,
        };

        Ok(vec![server.enhance_payment_requirements(
            base,
            supported_kind,
            &[],
        )])
    }

    /// Creates a 402 response from a list of requirements.
    #[must_use]
    pub const fn create_payment_required(
        &self,
        requirements: Vec<PaymentRequirements>,
        resource: Option<ResourceInfo>,
        error: Option<String>,
        extensions: Option<Value>,
    ) -> PaymentRequired {
        PaymentRequired {
            t402_version: T402_VERSION,
            error,
            resource,
            accepts: requirements,
            extensions,
        }
    }

    /// Finds the offered requirement a payload claims to pay.
    #[must_use]
    pub fn find_matching_requirements<'a>(
        &self,
        available: &'a [PaymentRequirements],
        payload: &PaymentPayload,
    ) -> Option<&'a PaymentRequirements> {
        available.iter().find(|req| {
            payload.accepted.scheme == req.scheme
                && payload.accepted.network == req.network
                && payload.accepted.amount == req.amount
                && payload.accepted.asset == req.asset
                && payload.accepted.pay_to == req.pay_to
        })
    }

    fn facilitator_for(
        &self,
        requirements: &PaymentRequirements,
    ) -> Result<&dyn FacilitatorClient, SchemeError> {
        self.find_kind(T402_VERSION, &requirements.network, &requirements.scheme)
            .and_then(|k| self.facilitator_clients.get(k.facilitator))
            .map(AsRef::as_ref)
            .ok_or_else(|| {
                SchemeNotFoundError::new(&requirements.scheme, &requirements.network).into()
            })
    }

    /// Verifies a payment through the facilitator that advertised its kind.
    ///
    /// # Errors
    ///
    /// Returns an error if the server is not initialized, no facilitator
    /// handles the kind, a hook aborts, or the facilitator call fails and
    /// no failure hook recovers.
    pub async fn verify_payment(
        &self,
        payload: &PaymentPayload,
        requirements: &PaymentRequirements,
    ) -> Result<VerifyResponse, SchemeError> {
        if !self.initialized {
            return Err(NOT_INITIALIZED.into());
        }

        let ctx = VerifyContext {
            payment_payload: payload.clone(),
            requirements: requirements.clone(),
        };
        for hook in &self.before_verify_hooks {
            if let Some(abort) = hook(&ctx).await {
                return Err(Box::new(PaymentAbortedError::new(abort.reason)));
            }
        }

        let result = match self.facilitator_for(requirements) {
            Ok(client) => client.verify(payload, requirements).await,
            Err(e) => Err(e),
        };

        let error = match result {
            Ok(response) if response.is_valid => {
                let result_ctx = VerifyResultContext {
                    payment_payload: ctx.payment_payload,
                    requirements: ctx.requirements,
                    result: response,
                };
                for hook in &self.after_verify_hooks {
                    hook(&result_ctx).await;
                }
                return Ok(result_ctx.result);
            }
            Ok(response) => {
                tracing::debug!(
                    network = %requirements.network,
                    reason = response.invalid_reason.as_deref().unwrap_or_default(),
                    "payment invalid"
                );
                let failure_ctx = VerifyFailureContext {
                    payment_payload: ctx.payment_payload,
                    requirements: ctx.requirements,
                    error: response.invalid_reason.clone().unwrap_or_default(),
                };
                for hook in &self.on_verify_failure_hooks {
                    if let Some(recovered) = hook(&failure_ctx).await {
                        return Ok(recovered.result);
                    }
                }
                return Ok(response);
            }
            Err(e) => e,
        };

        tracing::warn!(network = %requirements.network, error = %error, "verify failed");
        let failure_ctx = VerifyFailureContext {
            payment_payload: ctx.payment_payload,
            requirements: ctx.requirements,
            error: error.to_string(),
        };
        for hook in &self.on_verify_failure_hooks {
            if let Some(recovered) = hook(&failure_ctx).await {
                return Ok(recovered.result);
            }
        }
        Err(error)
    }

    /// Settles a payment through the facilitator that advertised its kind.
    ///
    /// # Errors
    ///
    /// See [`verify_payment`](Self::verify_payment).
    pub async fn settle_payment(
        &self,
        payload: &PaymentPayload,
        requirements: &PaymentRequirements,
    ) -> Result<SettleResponse, SchemeError> {
        if !self.initialized {
            return Err(NOT_INITIALIZED.into());
        }

        let ctx = SettleContext {
            payment_payload: payload.clone(),
            requirements: requirements.clone(),
        };
        for hook in &self.before_settle_hooks {
            if let Some(abort) = hook(&ctx).await {
                return Err(Box::new(PaymentAbortedError::new(abort.reason)));
            }
        }

        let result = match self.facilitator_for(requirements) {
            Ok(client) => client.settle(payload, requirements).await,
            Err(e) => Err(e),
        };

        let error = match result {
            Ok(response) if response.success => {
                tracing::debug!(
                    network = %response.network,
                    transaction = %response.transaction,
                    "payment settled"
                );
                let result_ctx = SettleResultContext {
                    payment_payload: ctx.payment_payload,
                    requirements: ctx.requirements,
                    result: response,
                };
                for hook in &self.after_settle_hooks {
                    hook(&result_ctx).await;
                }
                return Ok(result_ctx.result);
            }
            Ok(response) => {
                let failure_ctx = SettleFailureContext {
                    payment_payload: ctx.payment_payload,
                    requirements: ctx.requirements,
                    error: response.error_reason.clone().unwrap_or_default(),
                };
                for hook in &self.on_settle_failure_hooks {
                    if let Some(recovered) = hook(&failure_ctx).await {
                        return Ok(recovered.result);
                    }
                }
                return Ok(response);
            }
            Err(e) => e,
        };

        tracing::warn!(network = %requirements.network, error = %error, "settle failed");
        let failure_ctx = SettleFailureContext {
            payment_payload: ctx.payment_payload,
            requirements: ctx.requirements,
            error: error.to_string(),
        };
        for hook in &self.on_settle_failure_hooks {
            if let Some(recovered) = hook(&failure_ctx).await {
                return Ok(recovered.result);
            }
        }
        Err(error)
    }
}
