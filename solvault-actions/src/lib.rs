//! solvault-actions library
//!
//! Axum-based Action service for the solvault contribution vault.
//!
//! # Endpoints
//! - `GET /actions.json`: path routing rules for Action clients
//! - `GET /api/actions/transfer-sol`: offer list for the current round
//! - `POST /api/actions/transfer-sol`: unsigned transaction for the chosen offer
//! - `GET /api/actions/transfer-sol/status`: round, vault and RPC status
//! - `GET /health`

pub mod config;

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{rejection::QueryRejection, Json, Query, State},
    http::{
        header::{ACCEPT_ENCODING, AUTHORIZATION, CONTENT_ENCODING, CONTENT_TYPE},
        HeaderName, HeaderValue, Method, StatusCode,
    },
    response::IntoResponse,
    routing::get,
    Router,
};
use serde::{Deserialize, Serialize};
use solana_sdk::{
    pubkey::Pubkey,
    signature::{Keypair, Signer},
};
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
    set_header::SetResponseHeaderLayer,
};
use tracing::{info, warn};

use solvault_core::{
    icon_number, offers_distribute, offers_reset, select_branch, validation, Branch,
    FirstContributor, Lamports, LedgerClient, RoundSequencer, SolanaRpcClient,
    TransactionBuilder, TransferParams, VaultRailError, VaultStateReader, VaultSummary,
    WinnerSelector, SERVICE_ID,
};

pub use config::{ActionConfig, DEFAULT_PORT};

// ═══════════════════════════════════════════════════════════════════════════════
// CONSTANTS
// ═══════════════════════════════════════════════════════════════════════════════

/// Action protocol version advertised in `X-Action-Version`.
pub const ACTION_VERSION: &str = "2.1.3";

const TRANSFER_PATH: &str = "/api/actions/transfer-sol";
const DEFAULT_SOL_AMOUNT: &str = "1";
const OFFER_AMOUNTS: [&str; 3] = ["0.01", "0.05", "0.1"];
const RESET_AMOUNT: &str = "0.01";
const ACTION_TITLE: &str = "Solvault - Transfer Native SOL";
const ACTION_DESCRIPTION: &str = "Transfer SOL to another Solana wallet";

fn action_version_header() -> HeaderName {
    HeaderName::from_static("x-action-version")
}

fn blockchain_ids_header() -> HeaderName {
    HeaderName::from_static("x-blockchain-ids")
}

// ═══════════════════════════════════════════════════════════════════════════════
// STATE
// ═══════════════════════════════════════════════════════════════════════════════

/// Application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ActionConfig>,
    sequencer: Arc<RoundSequencer>,
    ledger: Arc<dyn LedgerClient>,
    builder: Arc<TransactionBuilder>,
    /// Recipient used when a request omits `to`; generated once per process.
    default_recipient: Pubkey,
}

impl AppState {
    /// State with the first-contributor payout policy.
    pub fn new(config: ActionConfig, ledger: Arc<dyn LedgerClient>) -> Self {
        Self::with_selector(config, ledger, Arc::new(FirstContributor))
    }

    pub fn with_selector(
        config: ActionConfig,
        ledger: Arc<dyn LedgerClient>,
        selector: Arc<dyn WinnerSelector>,
    ) -> Self {
        let builder = TransactionBuilder::new(&config.cluster, ledger.clone(), selector);
        Self {
            config: Arc::new(config),
            sequencer: Arc::new(RoundSequencer::new()),
            ledger,
            builder: Arc::new(builder),
            default_recipient: Keypair::new().pubkey(),
        }
    }

    /// State talking to the JSON-RPC node named by the environment.
    pub fn from_env() -> Result<Self, VaultRailError> {
        let config = ActionConfig::from_env()?;
        let ledger = Arc::new(SolanaRpcClient::new(config.cluster.rpc_url.clone()));
        Ok(Self::new(config, ledger))
    }

    /// Start the round counter at `index` instead of 0.
    pub fn with_round_index(mut self, index: u64) -> Self {
        self.sequencer = Arc::new(RoundSequencer::with_index(index));
        self
    }

    pub fn sequencer(&self) -> &RoundSequencer {
        &self.sequencer
    }

    pub fn vault_address(&self) -> Pubkey {
        self.builder.vault_address()
    }

    async fn vault_summary(&self) -> Result<Option<VaultSummary>, VaultRailError> {
        let reader = VaultStateReader::new(self.ledger.as_ref());
        Ok(reader
            .fetch(&self.vault_address())
            .await?
            .map(|vault| vault.summary()))
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// ROUTER
// ═══════════════════════════════════════════════════════════════════════════════

/// Build the router.
pub fn app_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::OPTIONS])
        .allow_headers([
            CONTENT_TYPE,
            AUTHORIZATION,
            CONTENT_ENCODING,
            ACCEPT_ENCODING,
            action_version_header(),
            blockchain_ids_header(),
        ])
        .expose_headers([action_version_header(), blockchain_ids_header()]);

    let blockchain_id = HeaderValue::from_static(state.config.cluster.cluster.blockchain_id());

    Router::new()
        .route("/health", get(health))
        .route("/actions.json", get(actions_json))
        .route(TRANSFER_PATH, get(get_transfer_sol).post(post_transfer_sol))
        .route(&format!("{}/status", TRANSFER_PATH), get(status))
        .nest_service("/static", ServeDir::new(&state.config.static_dir))
        .layer(SetResponseHeaderLayer::overriding(
            action_version_header(),
            HeaderValue::from_static(ACTION_VERSION),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            blockchain_ids_header(),
            blockchain_id,
        ))
        .layer(cors)
        .with_state(state)
}

/// Health check endpoint.
async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": SERVICE_ID
    }))
}

/// Path routing rules for Action clients.
async fn actions_json() -> impl IntoResponse {
    Json(serde_json::json!({
        "rules": [
            { "pathPattern": "/*", "apiPath": "/api/actions/*" },
            { "pathPattern": "/api/actions/**", "apiPath": "/api/actions/**" }
        ]
    }))
}

/// Round, vault and RPC status.
async fn status(State(state): State<AppState>) -> impl IntoResponse {
    let rpc_status = match state.ledger.get_slot().await {
        Ok(slot) => serde_json::json!({ "connected": true, "slot": slot }),
        Err(e) => serde_json::json!({ "connected": false, "error": e.to_string() }),
    };

    let vault_state = match state.vault_summary().await {
        Ok(Some(summary)) => serde_json::json!({ "initialized": true, "summary": summary }),
        Ok(None) => serde_json::json!({ "initialized": false }),
        Err(e) => serde_json::json!({ "error": e.to_string() }),
    };

    let cluster = &state.config.cluster;
    Json(serde_json::json!({
        "service": SERVICE_ID,
        "cluster": cluster.cluster.as_str(),
        "program_id": cluster.program_id.to_string(),
        "encoding": cluster.encoding,
        "vault": state.vault_address().to_string(),
        "round_index": state.sequencer.current_index(),
        "rpc": rpc_status,
        "vault_state": vault_state,
        "version": env!("CARGO_PKG_VERSION")
    }))
}

// ═══════════════════════════════════════════════════════════════════════════════
// REQUEST / RESPONSE TYPES
// ═══════════════════════════════════════════════════════════════════════════════

/// Query string shared by discovery and execution.
#[derive(Debug, Default, Deserialize)]
pub struct TransferQuery {
    pub to: Option<String>,
    pub amount: Option<String>,
    pub distribute: Option<String>,
    pub reset: Option<String>,
}

/// Validated query.
#[derive(Debug)]
struct TransferOptions {
    recipient: Pubkey,
    amount: Lamports,
    distribute: bool,
    reset: bool,
}

impl TransferQuery {
    fn validate(&self, default_recipient: Pubkey) -> Result<TransferOptions, VaultRailError> {
        let recipient = match self.to.as_deref() {
            Some(to) if !to.is_empty() => validation::require_valid_address("to", to)?,
            _ => default_recipient,
        };
        let amount = match self.amount.as_deref() {
            Some(amount) if !amount.is_empty() => {
                validation::require_positive_amount("amount", amount)?
            }
            _ => validation::require_positive_amount("amount", DEFAULT_SOL_AMOUNT)?,
        };
        Ok(TransferOptions {
            recipient,
            amount,
            distribute: self.distribute.as_deref() == Some("true"),
            reset: self.reset.as_deref() == Some("true"),
        })
    }
}

/// One offer in the discovery response.
#[derive(Debug, Serialize)]
pub struct LinkedAction {
    pub label: String,
    pub href: String,
}

#[derive(Debug, Serialize)]
pub struct ActionLinks {
    pub actions: Vec<LinkedAction>,
}

/// Discovery response.
#[derive(Debug, Serialize)]
pub struct ActionGetResponse {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub title: String,
    pub icon: String,
    pub label: String,
    pub description: String,
    pub links: ActionLinks,
}

/// Execution request body.
#[derive(Debug, Deserialize)]
pub struct ActionPostRequest {
    pub account: Option<String>,
}

/// Execution response.
#[derive(Debug, Serialize)]
pub struct ActionPostResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction: Option<String>,
    pub message: String,
}

// ═══════════════════════════════════════════════════════════════════════════════
// DISCOVERY
// ═══════════════════════════════════════════════════════════════════════════════

/// Offer list for a round index.
fn offers_for(index: u64, base_href: &str) -> Vec<LinkedAction> {
    let mut actions: Vec<LinkedAction> = OFFER_AMOUNTS
        .iter()
        .map(|amount| LinkedAction {
            label: format!("Send {} SOL", amount),
            href: format!("{}&amount={}", base_href, amount),
        })
        .collect();

    if offers_distribute(index) {
        actions.extend(OFFER_AMOUNTS.iter().map(|amount| LinkedAction {
            label: format!(
                "Send {} SOL and distribute 50% of vault to one of users",
                amount
            ),
            href: format!("{}&amount={}&distribute=true", base_href, amount),
        }));
    }

    if offers_reset(index) {
        actions.push(LinkedAction {
            label: "Reset round counter".to_string(),
            href: format!("{}&amount={}&reset=true", base_href, RESET_AMOUNT),
        });
    }

    actions
}

/// Offer list for the current round.
async fn get_transfer_sol(
    State(state): State<AppState>,
    query: Result<Query<TransferQuery>, QueryRejection>,
) -> Result<Json<ActionGetResponse>, ApiError> {
    let Query(query) = query.map_err(|r| ApiError::rejected(r, "message"))?;
    let options = query
        .validate(state.default_recipient)
        .map_err(ApiError::discovery)?;

    let index = state.sequencer.current_index();
    let base_url = &state.config.base_url;
    let base_href = format!("{}{}?to={}", base_url, TRANSFER_PATH, options.recipient);

    let description = match state.vault_summary().await {
        Ok(Some(summary)) => format!(
            "{}. The vault holds {} SOL from {} contributor(s).",
            ACTION_DESCRIPTION, summary.total_sol, summary.contributors
        ),
        Ok(None) => ACTION_DESCRIPTION.to_string(),
        Err(e) => {
            warn!("vault lookup failed during discovery: {}", e);
            ACTION_DESCRIPTION.to_string()
        }
    };

    Ok(Json(ActionGetResponse {
        kind: "action",
        title: ACTION_TITLE.to_string(),
        icon: format!("{}/static/board_{}.jpg", base_url, icon_number(index)),
        label: "Transfer SOL".to_string(),
        description,
        links: ActionLinks {
            actions: offers_for(index, &base_href),
        },
    }))
}

// ═══════════════════════════════════════════════════════════════════════════════
// EXECUTION
// ═══════════════════════════════════════════════════════════════════════════════

fn payer_from_body(body: &[u8]) -> Result<Pubkey, VaultRailError> {
    let account = serde_json::from_slice::<ActionPostRequest>(body)
        .ok()
        .and_then(|req| req.account)
        .filter(|account| !account.trim().is_empty())
        .ok_or(VaultRailError::MissingPayer)?;
    validation::require_valid_address("account", &account)
}

/// Build the unsigned transaction for the chosen offer.
async fn post_transfer_sol(
    State(state): State<AppState>,
    query: Result<Query<TransferQuery>, QueryRejection>,
    body: Bytes,
) -> Result<Json<ActionPostResponse>, ApiError> {
    let Query(query) = query.map_err(|r| {
        warn!("transfer-sol query rejected: {}", r.body_text());
        ApiError::rejected(r, "error")
    })?;
    execute(&state, &query, &body)
        .await
        .map(Json)
        .map_err(|e| {
            warn!(code = e.error_code(), "transfer-sol execution failed: {}", e);
            ApiError::execution(e)
        })
}

async fn execute(
    state: &AppState,
    query: &TransferQuery,
    body: &[u8],
) -> Result<ActionPostResponse, VaultRailError> {
    let options = query.validate(state.default_recipient)?;
    let payer = payer_from_body(body)?;

    let round = state.sequencer.begin().await;
    let branch = select_branch(round.index(), options.distribute, options.reset);
    info!(index = round.index(), ?branch, payer = %payer, "executing transfer-sol");

    if !branch.advances_round() {
        round.reset();
        info!("round index reset");
        return Ok(ActionPostResponse {
            transaction: None,
            message: "Index reset to 0".to_string(),
        });
    }

    let minimum_balance = state.ledger.get_minimum_balance_for_rent_exemption(0).await?;
    validation::require_rent_exempt(options.amount, minimum_balance, &options.recipient)?;

    let params = TransferParams {
        payer,
        recipient: options.recipient,
        amount: options.amount,
    };
    let built = state.builder.build(branch, &params).await?;
    let transaction = built.to_base64()?;

    let next = round.advance();
    info!(next_index = next, instructions = built.instructions(), "transaction prepared");

    let message = match (branch, built.winner) {
        (Branch::PartialPayout, Some(winner)) => {
            format!("Processed distribute action: 50% of the vault to {}", winner)
        }
        (Branch::FullPayout, Some(winner)) => {
            format!("Processed full distribute action: the whole vault to {}", winner)
        }
        _ => format!("Processed deposit action: {} SOL", params.amount),
    };

    Ok(ActionPostResponse {
        transaction: Some(transaction),
        message,
    })
}

// ═══════════════════════════════════════════════════════════════════════════════
// ERRORS
// ═══════════════════════════════════════════════════════════════════════════════

/// API error type.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    /// JSON field carrying the message: `message` for discovery, `error` for execution.
    key: &'static str,
    message: String,
}

impl ApiError {
    fn from_rail(err: VaultRailError, key: &'static str) -> Self {
        let status = StatusCode::from_u16(err.suggested_status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        ApiError {
            status,
            key,
            message: err.to_string(),
        }
    }

    /// Query string that failed to deserialize.
    fn rejected(rejection: QueryRejection, key: &'static str) -> Self {
        ApiError {
            status: rejection.status(),
            key,
            message: rejection.body_text(),
        }
    }

    fn discovery(err: VaultRailError) -> Self {
        Self::from_rail(err, "message")
    }

    fn execution(err: VaultRailError) -> Self {
        Self::from_rail(err, "error")
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let mut body = serde_json::Map::new();
        body.insert(self.key.to_string(), serde_json::Value::String(self.message));
        (self.status, Json(serde_json::Value::Object(body))).into_response()
    }
}

impl From<VaultRailError> for ApiError {
    fn from(err: VaultRailError) -> Self {
        Self::execution(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum_test::TestServer;
    use solvault_core::{rpc::mock::MockLedger, ClusterConfig};

    fn server() -> TestServer {
        let state = AppState::new(
            ActionConfig::new(ClusterConfig::localnet()),
            Arc::new(MockLedger::new()),
        );
        TestServer::new(app_router(state)).unwrap()
    }

    #[test]
    fn test_offer_counts() {
        assert_eq!(offers_for(0, "x?to=a").len(), 3);
        assert_eq!(offers_for(2, "x?to=a").len(), 4);
        assert_eq!(offers_for(9, "x?to=a").len(), 6);
        assert_eq!(offers_for(99, "x?to=a").len(), 3);
    }

    #[test]
    fn test_query_defaults() {
        let default_recipient = Pubkey::new_unique();
        let options = TransferQuery::default().validate(default_recipient).unwrap();
        assert_eq!(options.recipient, default_recipient);
        assert_eq!(options.amount.get(), 1_000_000_000);
        assert!(!options.distribute);
        assert!(!options.reset);
    }

    #[test]
    fn test_flags_require_literal_true() {
        let query = TransferQuery {
            distribute: Some("1".into()),
            reset: Some("true".into()),
            ..Default::default()
        };
        let options = query.validate(Pubkey::new_unique()).unwrap();
        assert!(!options.distribute);
        assert!(options.reset);
    }

    #[test]
    fn test_missing_payer() {
        assert!(matches!(payer_from_body(b""), Err(VaultRailError::MissingPayer)));
        assert!(matches!(payer_from_body(b"{}"), Err(VaultRailError::MissingPayer)));
        assert!(matches!(
            payer_from_body(br#"{"account":"nope"}"#),
            Err(VaultRailError::InvalidAddress(_))
        ));
    }

    #[tokio::test]
    async fn test_health() {
        let response = server().get("/health").await;
        response.assert_status_ok();
        let body: serde_json::Value = response.json();
        assert_eq!(body["service"], SERVICE_ID);
    }

    #[tokio::test]
    async fn test_action_headers() {
        let response = server().get("/actions.json").await;
        response.assert_status_ok();
        assert_eq!(response.header("x-action-version"), ACTION_VERSION);
        assert_eq!(response.header("x-blockchain-ids"), "solana:localnet");
    }
}
