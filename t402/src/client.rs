//! t402 client orchestration.
//!
//! [`T402Client`] answers a 402 response: it keeps the requirements its
//! registered schemes can pay, runs the configured policies and selector,
//! then asks the chosen scheme to sign and wraps the result in the
//! versioned envelope. Before/after/failure hooks surround the signing step.

use std::sync::Arc;

use t402_proto::{
    Network, PaymentPayload, PaymentPayloadV1, PaymentRequired, PaymentRequiredV1,
    PaymentRequirements, PaymentRequirementsV1, T402_VERSION, T402_VERSION_V1,
};

use crate::error::{NoMatchingRequirementsError, PaymentAbortedError, SchemeNotFoundError};
use crate::hooks::{
    AbortResult, PayloadView, PaymentCreatedContext, PaymentCreationContext,
    PaymentCreationFailureContext, PaymentRequiredView, RecoveredPayloadResult, RequirementsView,
};
use crate::scheme::{BoxFuture, SchemeClient, SchemeError, SchemeRegistry};

/// Narrows or reorders the candidate requirements.
///
/// Takes the protocol version and the candidate requirements, returns the
/// filtered/reordered list.
pub type PaymentPolicy =
    Box<dyn Fn(u32, Vec<RequirementsView>) -> Vec<RequirementsView> + Send + Sync>;

/// Selector function that picks the final requirement by index.
pub type PaymentRequirementsSelector = Box<dyn Fn(u32, &[RequirementsView]) -> usize + Send + Sync>;

/// Runs before signing; `Some(AbortResult)` cancels the payment.
pub type BeforePaymentCreationHook =
    Box<dyn Fn(&PaymentCreationContext) -> BoxFuture<'_, Option<AbortResult>> + Send + Sync>;

/// Observes a signed payload.
pub type AfterPaymentCreationHook =
    Box<dyn Fn(&PaymentCreatedContext) -> BoxFuture<'_, ()> + Send + Sync>;

/// Runs when signing fails; `Some(RecoveredPayloadResult)` substitutes a payload.
pub type OnPaymentCreationFailureHook = Box<
    dyn Fn(&PaymentCreationFailureContext) -> BoxFuture<'_, Option<RecoveredPayloadResult>>
        + Send
        + Sync,
>;

fn prefer(matches: impl Fn(&RequirementsView) -> bool + Send + Sync + 'static) -> PaymentPolicy {
    Box::new(move |_version, reqs| {
        let (mut preferred, others): (Vec<_>, Vec<_>) = reqs.into_iter().partition(&matches);
        preferred.extend(others);
        preferred
    })
}

/// Creates a policy that moves requirements on `network` to the front.
#[must_use]
pub fn prefer_network(network: Network) -> PaymentPolicy {
    prefer(move |r| r.network() == network)
}

/// Creates a policy that moves requirements using `scheme` to the front.
#[must_use]
pub fn prefer_scheme(scheme: String) -> PaymentPolicy {
    prefer(move |r| r.scheme() == scheme)
}

/// Creates a policy that drops requirements above `max_value` atomic units.
#[must_use]
pub fn max_amount(max_value: u128) -> PaymentPolicy {
    Box::new(move |_version, reqs| {
        reqs.into_iter()
            .filter(|r| r.amount().parse::<u128>().is_ok_and(|a| a <= max_value))
            .collect()
    })
}

const fn default_selector(_version: u32, _reqs: &[RequirementsView]) -> usize {
    0
}

/// Async t402 client with policies, hooks and payment creation.
pub struct T402Client {
    schemes: Arc<SchemeRegistry<dyn SchemeClient>>,
    policies: Vec<PaymentPolicy>,
    selector: PaymentRequirementsSelector,
    before_hooks: Vec<BeforePaymentCreationHook>,
    after_hooks: Vec<AfterPaymentCreationHook>,
    failure_hooks: Vec<OnPaymentCreationFailureHook>,
}

impl std::fmt::Debug for T402Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("T402Client")
            .field("schemes", &self.schemes)
            .field("policies_count", &self.policies.len())
            .field("before_hooks", &self.before_hooks.len())
            .field("after_hooks", &self.after_hooks.len())
            .field("failure_hooks", &self.failure_hooks.len())
            .finish_non_exhaustive()
    }
}

impl T402Client {
    /// Creates a client backed by a client scheme registry.
    #[must_use]
    pub fn new(schemes: Arc<SchemeRegistry<dyn SchemeClient>>) -> Self {
        Self {
            schemes,
            policies: Vec::new(),
            selector: Box::new(default_selector),
            before_hooks: Vec::new(),
            after_hooks: Vec::new(),
            failure_hooks: Vec::new(),
        }
    }

    /// Replaces the default first-candidate selector.
    #[must_use]
    pub fn with_selector(mut self, selector: PaymentRequirementsSelector) -> Self {
        self.selector = selector;
        self
    }

    /// Returns the scheme registry.
    #[must_use]
    pub const fn schemes(&self) -> &Arc<SchemeRegistry<dyn SchemeClient>> {
        &self.schemes
    }

    /// Adds a requirement filter policy. Policies run in registration order.
    pub fn register_policy(&mut self, policy: PaymentPolicy) -> &mut Self {
        self.policies.push(policy);
        self
    }

    /// Registers a before-payment-creation hook.
    pub fn on_before_payment_creation(&mut self, hook: BeforePaymentCreationHook) -> &mut Self {
        self.before_hooks.push(hook);
        self
    }

    /// Adds a hook run after a payload is signed.
    pub fn on_after_payment_creation(&mut self, hook: AfterPaymentCreationHook) -> &mut Self {
        self.after_hooks.push(hook);
        self
    }

    /// Registers a payment-creation failure hook.
    pub fn on_payment_creation_failure(&mut self, hook: OnPaymentCreationFailureHook) -> &mut Self {
        self.failure_hooks.push(hook);
        self
    }

    fn select(
        &self,
        version: u32,
        candidates: Vec<RequirementsView>,
    ) -> Result<RequirementsView, NoMatchingRequirementsError> {
        let mut filtered: Vec<RequirementsView> = candidates
            .into_iter()
            .filter(|r| self.schemes.has_scheme(r.network(), r.scheme(), version))
            .collect();

        if filtered.is_empty() {
            return Err(NoMatchingRequirementsError::new(
                "No payment requirements match registered schemes",
            ));
        }

        for policy in &self.policies {
            filtered = policy(version, filtered);
            if filtered.is_empty() {
                return Err(NoMatchingRequirementsError::new(
                    "All requirements filtered out by policies",
                ));
            }
        }

        let idx = (self.selector)(version, &filtered);
        filtered
            .into_iter()
            .nth(idx)
            .ok_or_else(|| NoMatchingRequirementsError::new("Selector returned invalid index"))
    }

    async fn sign(
        &self,
        version: u32,
        requirements: &PaymentRequirements,
    ) -> Result<serde_json::Value, SchemeError> {
        let scheme = self
            .schemes
            .get(&requirements.network, &requirements.scheme, version)
            .ok_or_else(|| SchemeNotFoundError::new(&requirements.scheme, &requirements.network))?;
        scheme.create_payment_payload(requirements).await
    }

    async fn run_before_hooks(&self, ctx: &PaymentCreationContext) -> Result<(), SchemeError> {
        for hook in &self.before_hooks {
            if let Some(abort) = hook(ctx).await {
                return Err(Box::new(PaymentAbortedError::new(abort.reason)));
            }
        }
        Ok(())
    }

    /// Creates a V2 payment payload for a 402 response.
    ///
    /// # Errors
    ///
    /// Returns an error if no requirement can be paid, a hook aborts, or
    /// signing fails and no failure hook recovers.
    pub async fn create_payment_payload(
        &self,
        payment_required: &PaymentRequired,
    ) -> Result<PaymentPayload, SchemeError> {
        let candidates = payment_required
            .accepts
            .iter()
            .cloned()
            .map(RequirementsView::V2)
            .collect();
        let RequirementsView::V2(selected) = self.select(T402_VERSION, candidates)? else {
            return Err(Box::new(NoMatchingRequirementsError::new(
                "Selector returned invalid index",
            )));
        };

        let required_view = PaymentRequiredView::V2(payment_required.clone());
        self.run_before_hooks(&PaymentCreationContext {
            payment_required: required_view.clone(),
            selected_requirements: RequirementsView::V2(selected.clone()),
        })
        .await?;

        let result = self
            .sign(T402_VERSION, &selected)
            .await
            .map(|inner| PaymentPayload {
                t402_version: T402_VERSION,
                payload: inner,
                accepted: selected.clone(),
                resource: payment_required.resource.clone(),
                extensions: payment_required.extensions.clone(),
            });

        match result {
            Ok(payload) => {
                tracing::debug!(network = %selected.network, scheme = %selected.scheme, "created payment payload");
                let created = PaymentCreatedContext {
                    payment_required: required_view,
                    selected_requirements: RequirementsView::V2(selected),
                    payment_payload: PayloadView::V2(Box::new(payload.clone())),
                };
                for hook in &self.after_hooks {
                    hook(&created).await;
                }
                Ok(payload)
            }
            Err(e) => {
                let failure = PaymentCreationFailureContext {
                    payment_required: required_view,
                    selected_requirements: RequirementsView::V2(selected),
                    error: e.to_string(),
                };
                for hook in &self.failure_hooks {
                    if let Some(RecoveredPayloadResult::V2(p)) = hook(&failure).await {
                        return Ok(*p);
                    }
                }
                Err(e)
            }
        }
    }

    /// Creates a V1 payment payload for a legacy 402 response.
    ///
    /// # Errors
    ///
    /// See [`create_payment_payload`](Self::create_payment_payload).
    pub async fn create_payment_payload_v1(
        &self,
        payment_required: &PaymentRequiredV1,
    ) -> Result<PaymentPayloadV1, SchemeError> {
        let candidates = payment_required
            .accepts
            .iter()
            .cloned()
            .map(RequirementsView::V1)
            .collect();
        let RequirementsView::V1(selected) = self.select(T402_VERSION_V1, candidates)? else {
            return Err(Box::new(NoMatchingRequirementsError::new(
                "Selector returned invalid index",
            )));
        };

        let required_view = PaymentRequiredView::V1(payment_required.clone());
        self.run_before_hooks(&PaymentCreationContext {
            payment_required: required_view.clone(),
            selected_requirements: RequirementsView::V1(selected.clone()),
        })
        .await?;

        let result = self
            .sign(T402_VERSION_V1, &selected.to_v2())
            .await
            .map(|inner| v1_payload(&selected, inner));

        match result {
            Ok(payload) => {
                let created = PaymentCreatedContext {
                    payment_required: required_view,
                    selected_requirements: RequirementsView::V1(selected),
                    payment_payload: PayloadView::V1(payload.clone()),
                };
                for hook in &self.after_hooks {
                    hook(&created).await;
                }
                Ok(payload)
            }
            Err(e) => {
                let failure = PaymentCreationFailureContext {
                    payment_required: required_view,
                    selected_requirements: RequirementsView::V1(selected),
                    error: e.to_string(),
                };
                for hook in &self.failure_hooks {
                    if let Some(RecoveredPayloadResult::V1(p)) = hook(&failure).await {
                        return Ok(p);
                    }
                }
                Err(e)
            }
        }
    }
}

fn v1_payload(selected: &PaymentRequirementsV1, inner: serde_json::Value) -> PaymentPayloadV1 {
    PaymentPayloadV1 {
        t402_version: T402_VERSION_V1,
        scheme: selected.scheme.clone(),
        network: selected.network.clone(),
        payload: inner,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheme::SchemeId;
    use serde_json::{Map, Value, json};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct EchoScheme {
        calls: AtomicUsize,
        fail: bool,
    }

    impl SchemeId for EchoScheme {
        fn namespace(&self) -> &str {
            "ton"
        }
        fn scheme(&self) -> &str {
            "exact"
        }
    }

    impl SchemeClient for EchoScheme {
        fn create_payment_payload<'a>(
            &'a self,
            requirements: &'a PaymentRequirements,
        ) -> BoxFuture<'a, Result<Value, SchemeError>> {
            Box::pin(async move {
                self.calls.fetch_add(1, Ordering::SeqCst);
                if self.fail {
                    return Err("signer offline".into());
                }
                Ok(json!({"signedBoc": "te6c", "amount": requirements.amount}))
            })
        }
    }

    fn requirements(network: &str, amount: &str) -> PaymentRequirements {
        PaymentRequirements {
            scheme: "exact".into(),
            network: network.into(),
            asset: "EQCxE6mUtQJKFnGfaROTKOt1lZbDiiX1kCixRv7Nw2Id_sDs".into(),
            amount: amount.into(),
            pay_to: "EQBvW8Z5huBkMJYdnfAEM5JqTNkuWX3diqYENkWsIL0XggGG".into(),
            max_timeout_seconds: 300,
            extra: Map::new(),
        }
    }

    fn required(accepts: Vec<PaymentRequirements>) -> PaymentRequired {
        PaymentRequired {
            t402_version: 2,
            error: None,
            resource: None,
            accepts,
            extensions: None,
        }
    }

    fn client(fail: bool) -> (T402Client, Arc<EchoScheme>) {
        let registry: Arc<SchemeRegistry<dyn SchemeClient>> = Arc::new(SchemeRegistry::new());
        let scheme = Arc::new(EchoScheme {
            calls: AtomicUsize::new(0),
            fail,
        });
        registry.register("ton:*", Arc::clone(&scheme) as Arc<dyn SchemeClient>).unwrap();
        (T402Client::new(registry), scheme)
    }

    #[tokio::test]
    async fn wraps_scheme_payload_in_v2_envelope() {
        let (client, _) = client(false);
        let req = requirements("ton:mainnet", "1000");
        let payload = client
            .create_payment_payload(&required(vec![
                requirements("eip155:8453", "1"),
                req.clone(),
            ]))
            .await
            .unwrap();

        assert_eq!(payload.t402_version, 2);
        assert_eq!(payload.accepted, req);
        assert_eq!(payload.payload["signedBoc"], "te6c");
    }

    #[tokio::test]
    async fn policies_can_filter_everything() {
        let (mut client, scheme) = client(false);
        client.register_policy(max_amount(999));
        let err = client
            .create_payment_payload(&required(vec![requirements("ton:mainnet", "1000")]))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "All requirements filtered out by policies");
        assert_eq!(scheme.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn unsupported_networks_do_not_match() {
        let (client, _) = client(false);
        let err = client
            .create_payment_payload(&required(vec![requirements("tron:mainnet", "1")]))
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "No payment requirements match registered schemes"
        );
    }

    #[tokio::test]
    async fn prefer_network_reorders() {
        let (mut client, _) = client(false);
        client.register_policy(prefer_network("ton:testnet".into()));
        let payload = client
            .create_payment_payload(&required(vec![
                requirements("ton:mainnet", "1"),
                requirements("ton:testnet", "2"),
            ]))
            .await
            .unwrap();
        assert_eq!(payload.accepted.network, "ton:testnet");
    }

    #[tokio::test]
    async fn before_hook_aborts_without_signing() {
        let (mut client, scheme) = client(false);
        client.on_before_payment_creation(Box::new(|_ctx| {
            Box::pin(async { Some(AbortResult::new("budget exceeded")) })
        }));
        let err = client
            .create_payment_payload(&required(vec![requirements("ton:mainnet", "1")]))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Payment aborted: budget exceeded");
        assert_eq!(scheme.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn failure_hook_recovers() {
        let (mut client, _) = client(true);
        client.on_payment_creation_failure(Box::new(|ctx| {
            let RequirementsView::V2(accepted) = ctx.selected_requirements.clone() else {
                return Box::pin(async { None });
            };
            Box::pin(async move {
                Some(RecoveredPayloadResult::V2(Box::new(PaymentPayload {
                    t402_version: 2,
                    payload: json!({"recovered": true}),
                    accepted,
                    resource: None,
                    extensions: None,
                })))
            })
        }));
        let payload = client
            .create_payment_payload(&required(vec![requirements("ton:mainnet", "1")]))
            .await
            .unwrap();
        assert_eq!(payload.payload["recovered"], true);
    }

    #[tokio::test]
    async fn v1_uses_v1_registrations() {
        let registry: Arc<SchemeRegistry<dyn SchemeClient>> = Arc::new(SchemeRegistry::new());
        registry
            .register_v1(
                "ton-mainnet",
                Arc::new(EchoScheme {
                    calls: AtomicUsize::new(0),
                    fail: false,
                }),
            )
            .unwrap();
        let client = T402Client::new(registry);
        let required: PaymentRequiredV1 = serde_json::from_value(json!({
            "t402Version": 1,
            "accepts": [{
                "scheme": "exact",
                "network": "ton-mainnet",
                "maxAmountRequired": "5",
                "resource": "/premium",
                "payTo": "EQBvW8Z5huBkMJYdnfAEM5JqTNkuWX3diqYENkWsIL0XggGG",
                "maxTimeoutSeconds": 60,
                "asset": "EQCxE6mUtQJKFnGfaROTKOt1lZbDiiX1kCixRv7Nw2Id_sDs"
            }]
        }))
        .unwrap();

        let payload = client.create_payment_payload_v1(&required).await.unwrap();
        assert_eq!(payload.t402_version, 1);
        assert_eq!(payload.network, "ton-mainnet");
        assert_eq!(payload.payload["amount"], "5");
    }
}
