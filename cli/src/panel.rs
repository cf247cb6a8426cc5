//! Swap panel controller
//!
//! Mediates between user input and the pool contract. Holds the session
//! (connected account), the last-read reserves and price, the current swap
//! quote and one transaction record per write action.
//!
//! All three write actions (swap, add liquidity, remove liquidity) run the
//! same approve-then-act flow: authorize, send each approval and wait for it
//! to be mined, submit the pool call, mark the action pending, wait for the
//! receipt. Nothing is retried and a confirmed approval is never rolled back.
//!
//! Methods take `&self` and may overlap. State sits behind a mutex that is
//! never held across an await. Two things keep overlapping calls honest:
//! - every swap-input change bumps a sequence number, and a quote that
//!   resolves after a newer input is dropped;
//! - each write action has an in-flight flag, so a second trigger while one
//!   is pending is a no-op.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use amm_model::{format_units, min_output, parse_units, SlippageTolerance};
use ethers::types::{Address, U256};
use log::{debug, error, info, warn};
use parking_lot::Mutex;

use crate::backend::{
    AddLiquidityArgs, PoolCall, PoolClient, RemoveLiquidityArgs, SwapArgs, TxReceipt,
    WalletProvider, NO_DEADLINE,
};
use crate::config::Contracts;
use crate::error::{PanelError, WalletError};
use crate::state::{
    ActionKind, PanelState, RemovalResult, ReserveSnapshot, SwapQuote, TxStatus,
};

// ============================================================================
// Outcomes
// ============================================================================

/// Why a write action did not start
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    NotConnected,
    NoQuote,
    MissingAmount,
    InFlight,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            SkipReason::NotConnected => "no account connected",
            SkipReason::NoQuote => "no quote for the current input",
            SkipReason::MissingAmount => "amount missing",
            SkipReason::InFlight => "already in progress",
        };
        f.write_str(text)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionOutcome {
    /// Guard failed; no call was issued
    Skipped(SkipReason),
    Completed(TxReceipt),
    /// Status message recorded for the action
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuoteUpdate {
    /// Input empty or no account: quote cleared, nothing read
    Cleared,
    Applied(SwapQuote),
    /// A newer input arrived while this quote was being read
    Stale,
}

/// Per-token minimums for liquidity actions (zero = unprotected)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LiquidityLimits {
    pub min_a: U256,
    pub min_b: U256,
}

/// Token allowance granted to the pool before a write
#[derive(Debug, Clone, Copy)]
struct Approval {
    token: Address,
    amount: U256,
}

// ============================================================================
// In-flight guards
// ============================================================================

#[derive(Default)]
struct InFlight {
    flags: [AtomicBool; 3],
}

impl InFlight {
    fn try_acquire(&self, kind: ActionKind) -> Option<InFlightGuard<'_>> {
        let flag = &self.flags[kind.index()];
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| InFlightGuard { flag })
    }

    fn is_busy(&self, kind: ActionKind) -> bool {
        self.flags[kind.index()].load(Ordering::Acquire)
    }
}

struct InFlightGuard<'a> {
    flag: &'a AtomicBool,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

// ============================================================================
// Controller
// ============================================================================

pub struct SwapPanel {
    pool: Arc<dyn PoolClient>,
    wallet: Option<Arc<dyn WalletProvider>>,
    contracts: Contracts,
    chain_id: u64,
    state: Mutex<PanelState>,
    in_flight: InFlight,
}

impl SwapPanel {
    pub fn new(
        pool: Arc<dyn PoolClient>,
        wallet: Option<Arc<dyn WalletProvider>>,
        contracts: Contracts,
        chain_id: u64,
    ) -> Self {
        Self {
            pool,
            wallet,
            contracts,
            chain_id,
            state: Mutex::new(PanelState::default()),
            in_flight: InFlight::default(),
        }
    }

    pub fn with_slippage(self, slippage: SlippageTolerance) -> Self {
        self.state.lock().slippage = slippage;
        self
    }

    pub fn contracts(&self) -> &Contracts {
        &self.contracts
    }

    /// Copy of the current state for display
    pub fn snapshot(&self) -> PanelState {
        self.state.lock().clone()
    }

    pub fn account(&self) -> Option<Address> {
        self.state.lock().account
    }

    pub fn is_busy(&self, kind: ActionKind) -> bool {
        self.in_flight.is_busy(kind)
    }

    pub fn set_slippage(&self, percent: u32) -> Result<SlippageTolerance, PanelError> {
        let slippage = SlippageTolerance::new(percent)?;
        self.state.lock().slippage = slippage;
        Ok(slippage)
    }

    // ------------------------------------------------------------------------
    // Session and reads
    // ------------------------------------------------------------------------

    /// Switch network (best effort), request accounts and adopt the first.
    /// Reserves are refreshed when the account changes.
    pub async fn connect(&self) -> Result<Address, PanelError> {
        let wallet = self.wallet()?;
        self.switch_chain_best_effort(wallet.as_ref()).await;

        let accounts = wallet.request_accounts().await?;
        let account = accounts.first().copied().ok_or(WalletError::NoAccounts)?;

        let changed = {
            let mut state = self.state.lock();
            let changed = state.account != Some(account);
            state.account = Some(account);
            changed
        };
        info!("Connected account {:?} on chain {}", account, self.chain_id);

        if changed {
            self.refresh_reserves_logged().await;
        }
        Ok(account)
    }

    pub async fn refresh_reserves(&self) -> Result<ReserveSnapshot, PanelError> {
        let (reserve_a, reserve_b) = self
            .pool
            .get_reserves(self.contracts.token_a, self.contracts.token_b)
            .await?;

        let snapshot = ReserveSnapshot {
            a: format_units(reserve_a),
            b: format_units(reserve_b),
        };
        self.state.lock().reserves = snapshot.clone();
        debug!("Reserves A={} B={}", snapshot.a, snapshot.b);
        Ok(snapshot)
    }

    /// Spot price of token A in token B
    pub async fn show_price(&self) -> Result<String, PanelError> {
        self.wallet()?.request_accounts().await?;

        let raw = self
            .pool
            .get_price(self.contracts.token_a, self.contracts.token_b)
            .await?;
        let price = format_units(raw);
        self.state.lock().price = Some(price.clone());
        Ok(price)
    }

    /// Record a new swap input and re-quote it.
    ///
    /// Clears the previous quote and swap status first. Empty input, or no
    /// connected account, stops there without touching the network.
    pub async fn update_swap_input(&self, input: &str) -> Result<QuoteUpdate, PanelError> {
        let (seq, account) = {
            let mut state = self.state.lock();
            state.swap_input = input.to_string();
            state.swap.reset();
            state.quote = None;
            state.quote_seq += 1;
            (state.quote_seq, state.account)
        };

        if input.trim().is_empty() || account.is_none() {
            return Ok(QuoteUpdate::Cleared);
        }

        let amount_in = parse_units(input)?;
        let (reserve_a, reserve_b) = self
            .pool
            .get_reserves(self.contracts.token_a, self.contracts.token_b)
            .await?;
        let amount_out = self.pool.get_amount_out(amount_in, reserve_a, reserve_b).await?;

        let quote = SwapQuote {
            amount_in: input.trim().to_string(),
            amount_in_wei: amount_in,
            amount_out,
            amount_out_display: format_units(amount_out),
        };

        let mut state = self.state.lock();
        if state.quote_seq != seq {
            debug!(
                "Dropping stale quote for {:?} (seq {} < {})",
                quote.amount_in, seq, state.quote_seq
            );
            return Ok(QuoteUpdate::Stale);
        }
        state.quote = Some(quote.clone());
        Ok(QuoteUpdate::Applied(quote))
    }

    // ------------------------------------------------------------------------
    // Write actions
    // ------------------------------------------------------------------------

    /// Approve the input amount of token A, then swap A→B with the
    /// slippage floor as minimum output.
    pub async fn execute_swap(&self) -> ActionOutcome {
        let (quote, account, slippage, seq) = {
            let state = self.state.lock();
            (state.quote.clone(), state.account, state.slippage, state.quote_seq)
        };
        let Some(account) = account else {
            return ActionOutcome::Skipped(SkipReason::NotConnected);
        };
        let quote = match quote {
            Some(quote) if !quote.amount_out.is_zero() => quote,
            _ => return ActionOutcome::Skipped(SkipReason::NoQuote),
        };
        let Some(_guard) = self.in_flight.try_acquire(ActionKind::Swap) else {
            return ActionOutcome::Skipped(SkipReason::InFlight);
        };

        self.state.lock().swap.reset();
        let result = self.swap_flow(account, &quote, slippage).await;
        let outcome = self.finish(ActionKind::Swap, result);

        // Input typed while the swap was pending keeps its own quote
        if matches!(outcome, ActionOutcome::Completed(_)) {
            let mut state = self.state.lock();
            if state.quote_seq == seq {
                state.quote = None;
                state.quote_seq += 1;
            }
        }
        outcome
    }

    /// Approve both tokens, then deposit them
    pub async fn add_liquidity(
        &self,
        amount_a: &str,
        amount_b: &str,
        limits: LiquidityLimits,
    ) -> ActionOutcome {
        let Some(account) = self.account() else {
            return ActionOutcome::Skipped(SkipReason::NotConnected);
        };
        if amount_a.trim().is_empty() || amount_b.trim().is_empty() {
            return ActionOutcome::Skipped(SkipReason::MissingAmount);
        }
        let Some(_guard) = self.in_flight.try_acquire(ActionKind::AddLiquidity) else {
            return ActionOutcome::Skipped(SkipReason::InFlight);
        };

        self.state.lock().add_liquidity.reset();
        let result = self.add_liquidity_flow(account, amount_a, amount_b, limits).await;
        let outcome = self.finish(ActionKind::AddLiquidity, result);

        if matches!(outcome, ActionOutcome::Completed(_)) {
            self.refresh_reserves_logged().await;
        }
        outcome
    }

    /// Burn LP shares for the underlying tokens.
    ///
    /// The LP token is approved first only when its address is configured.
    /// The returned amounts are read with a static call before submitting.
    pub async fn remove_liquidity(
        &self,
        lp_amount: &str,
        limits: LiquidityLimits,
    ) -> ActionOutcome {
        let Some(account) = self.account() else {
            return ActionOutcome::Skipped(SkipReason::NotConnected);
        };
        if lp_amount.trim().is_empty() {
            return ActionOutcome::Skipped(SkipReason::MissingAmount);
        }
        let Some(_guard) = self.in_flight.try_acquire(ActionKind::RemoveLiquidity) else {
            return ActionOutcome::Skipped(SkipReason::InFlight);
        };

        {
            let mut state = self.state.lock();
            state.remove_liquidity.reset();
            state.removal = None;
        }
        let result = self.remove_liquidity_flow(account, lp_amount, limits).await;
        let outcome = self.finish(ActionKind::RemoveLiquidity, result);

        if matches!(outcome, ActionOutcome::Completed(_)) {
            self.refresh_reserves_logged().await;
        }
        outcome
    }

    async fn swap_flow(
        &self,
        account: Address,
        quote: &SwapQuote,
        slippage: SlippageTolerance,
    ) -> Result<TxReceipt, PanelError> {
        self.authorize().await?;
        self.approve_all(&[Approval {
            token: self.contracts.token_a,
            amount: quote.amount_in_wei,
        }])
        .await?;

        let amount_out_min = min_output(quote.amount_out, slippage);
        debug!(
            "Swap {} A, quoted {} B, min {} B at {}",
            quote.amount_in,
            quote.amount_out_display,
            format_units(amount_out_min),
            slippage
        );

        let call = PoolCall::Swap(SwapArgs {
            amount_in: quote.amount_in_wei,
            amount_out_min,
            path: vec![self.contracts.token_a, self.contracts.token_b],
            to: account,
            deadline: NO_DEADLINE,
        });
        self.submit_and_confirm(ActionKind::Swap, &call).await
    }

    async fn add_liquidity_flow(
        &self,
        account: Address,
        amount_a: &str,
        amount_b: &str,
        limits: LiquidityLimits,
    ) -> Result<TxReceipt, PanelError> {
        self.authorize().await?;

        let amount_a = parse_units(amount_a)?;
        let amount_b = parse_units(amount_b)?;

        self.approve_all(&[
            Approval {
                token: self.contracts.token_a,
                amount: amount_a,
            },
            Approval {
                token: self.contracts.token_b,
                amount: amount_b,
            },
        ])
        .await?;

        let call = PoolCall::AddLiquidity(AddLiquidityArgs {
            token_a: self.contracts.token_a,
            token_b: self.contracts.token_b,
            amount_a_desired: amount_a,
            amount_b_desired: amount_b,
            amount_a_min: limits.min_a,
            amount_b_min: limits.min_b,
            to: account,
            deadline: NO_DEADLINE,
        });
        self.submit_and_confirm(ActionKind::AddLiquidity, &call).await
    }

    async fn remove_liquidity_flow(
        &self,
        account: Address,
        lp_amount: &str,
        limits: LiquidityLimits,
    ) -> Result<TxReceipt, PanelError> {
        self.authorize().await?;

        let liquidity = parse_units(lp_amount)?;
        let approvals: Vec<Approval> = self
            .contracts
            .lp_token
            .map(|token| Approval { token, amount: liquidity })
            .into_iter()
            .collect();
        self.approve_all(&approvals).await?;

        let args = RemoveLiquidityArgs {
            token_a: self.contracts.token_a,
            token_b: self.contracts.token_b,
            liquidity,
            amount_a_min: limits.min_a,
            amount_b_min: limits.min_b,
            to: account,
            deadline: NO_DEADLINE,
        };

        let (out_a, out_b) = self.pool.preview_remove_liquidity(&args).await?;
        self.state.lock().removal = Some(RemovalResult {
            a: format_units(out_a),
            b: format_units(out_b),
        });

        self.submit_and_confirm(ActionKind::RemoveLiquidity, &PoolCall::RemoveLiquidity(args))
            .await
    }

    // ------------------------------------------------------------------------
    // Approve-then-act steps
    // ------------------------------------------------------------------------

    /// Network switch (best effort) and signer authorization
    async fn authorize(&self) -> Result<(), PanelError> {
        let wallet = self.wallet()?;
        self.switch_chain_best_effort(wallet.as_ref()).await;
        wallet.request_accounts().await?;
        Ok(())
    }

    /// Each approval is mined before the next one is sent
    async fn approve_all(&self, approvals: &[Approval]) -> Result<(), PanelError> {
        for approval in approvals {
            debug!(
                "Approving {} of {:?} for pool {:?}",
                format_units(approval.amount),
                approval.token,
                self.contracts.pool
            );
            let tx_hash = self
                .pool
                .approve(approval.token, self.contracts.pool, approval.amount)
                .await?;
            self.pool.wait_for_receipt(tx_hash).await?;
        }
        Ok(())
    }

    async fn submit_and_confirm(
        &self,
        kind: ActionKind,
        call: &PoolCall,
    ) -> Result<TxReceipt, PanelError> {
        let tx_hash = self.pool.submit(call).await?;
        info!("{} submitted: {:?}", call.method(), tx_hash);
        self.set_status(kind, TxStatus::Pending(kind.pending_text().to_string()));

        let receipt = self.pool.wait_for_receipt(tx_hash).await?;
        Ok(receipt)
    }

    /// Record the result of a write flow in its transaction record
    fn finish(&self, kind: ActionKind, result: Result<TxReceipt, PanelError>) -> ActionOutcome {
        match result {
            Ok(receipt) => {
                info!(
                    "{}: {:?} in block {:?}",
                    kind.success_text(),
                    receipt.tx_hash,
                    receipt.block_number
                );
                let mut state = self.state.lock();
                let record = state.record_mut(kind);
                record.status = TxStatus::Success(kind.success_text().to_string());
                record.tx_hash = Some(receipt.tx_hash);
                ActionOutcome::Completed(receipt)
            }
            Err(err) => {
                let message = format!("{}{}", kind.failure_prefix(), err);
                error!("{}", message);
                self.set_status(kind, TxStatus::Failure(message.clone()));
                ActionOutcome::Failed(message)
            }
        }
    }

    // ------------------------------------------------------------------------
    // Helpers
    // ------------------------------------------------------------------------

    fn wallet(&self) -> Result<&Arc<dyn WalletProvider>, WalletError> {
        self.wallet.as_ref().ok_or(WalletError::NotDetected)
    }

    async fn switch_chain_best_effort(&self, wallet: &dyn WalletProvider) {
        if let Err(err) = wallet.switch_chain(self.chain_id).await {
            warn!("Network switch to chain {} ignored: {}", self.chain_id, err);
        }
    }

    async fn refresh_reserves_logged(&self) {
        if let Err(err) = self.refresh_reserves().await {
            warn!("Reserve refresh failed: {}", err);
        }
    }

    fn set_status(&self, kind: ActionKind, status: TxStatus) {
        self.state.lock().record_mut(kind).status = status;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ClientError;
    use crate::sim::SimChain;
    use amm_model::one_token;
    use async_trait::async_trait;
    use ethers::types::TxHash;
    use tokio::sync::oneshot;

    // ------------------------------------------------------------------------
    // Scripted pool: SimChain plus call log, injected failures and gates
    // ------------------------------------------------------------------------

    struct ScriptedPool {
        chain: Arc<SimChain>,
        calls: Mutex<Vec<String>>,
        submitted: Mutex<Vec<PoolCall>>,
        fail_on: Mutex<Option<&'static str>>,
        gates: Mutex<Vec<Gate>>,
    }

    struct Gate {
        method: &'static str,
        skip: usize,
        release: oneshot::Receiver<()>,
    }

    impl ScriptedPool {
        fn new(chain: Arc<SimChain>) -> Self {
            Self {
                chain,
                calls: Mutex::new(Vec::new()),
                submitted: Mutex::new(Vec::new()),
                fail_on: Mutex::new(None),
                gates: Mutex::new(Vec::new()),
            }
        }

        fn fail_on(&self, method: &'static str) {
            *self.fail_on.lock() = Some(method);
        }

        /// Next call to `method` waits until the returned sender fires
        fn hold(&self, method: &'static str) -> oneshot::Sender<()> {
            self.hold_nth(method, 0)
        }

        /// Like `hold`, but lets `skip` calls through first
        fn hold_nth(&self, method: &'static str, skip: usize) -> oneshot::Sender<()> {
            let (tx, rx) = oneshot::channel();
            self.gates.lock().push(Gate { method, skip, release: rx });
            tx
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().clone()
        }

        fn clear_calls(&self) {
            self.calls.lock().clear();
        }

        async fn checkpoint(&self, method: &'static str) -> Result<(), ClientError> {
            self.calls.lock().push(method.to_string());
            let gate = {
                let mut gates = self.gates.lock();
                match gates.iter().position(|g| g.method == method) {
                    Some(idx) if gates[idx].skip == 0 => Some(gates.remove(idx).release),
                    Some(idx) => {
                        gates[idx].skip -= 1;
                        None
                    }
                    None => None,
                }
            };
            if let Some(release) = gate {
                let _ = release.await;
            }
            if *self.fail_on.lock() == Some(method) {
                return Err(ClientError::Rpc(format!("{} rejected", method)));
            }
            Ok(())
        }
    }

    #[async_trait]
    impl PoolClient for ScriptedPool {
        async fn get_reserves(
            &self,
            token_a: Address,
            token_b: Address,
        ) -> Result<(U256, U256), ClientError> {
            self.checkpoint("get_reserves").await?;
            self.chain.get_reserves(token_a, token_b).await
        }

        async fn get_price(&self, token_a: Address, token_b: Address) -> Result<U256, ClientError> {
            self.checkpoint("get_price").await?;
            self.chain.get_price(token_a, token_b).await
        }

        async fn get_amount_out(
            &self,
            amount_in: U256,
            reserve_in: U256,
            reserve_out: U256,
        ) -> Result<U256, ClientError> {
            self.checkpoint("get_amount_out").await?;
            self.chain.get_amount_out(amount_in, reserve_in, reserve_out).await
        }

        async fn approve(
            &self,
            token: Address,
            spender: Address,
            amount: U256,
        ) -> Result<TxHash, ClientError> {
            self.checkpoint("approve").await?;
            self.chain.approve(token, spender, amount).await
        }

        async fn submit(&self, call: &PoolCall) -> Result<TxHash, ClientError> {
            self.checkpoint("submit").await?;
            self.submitted.lock().push(call.clone());
            self.chain.submit(call).await
        }

        async fn preview_remove_liquidity(
            &self,
            args: &RemoveLiquidityArgs,
        ) -> Result<(U256, U256), ClientError> {
            self.checkpoint("preview_remove_liquidity").await?;
            self.chain.preview_remove_liquidity(args).await
        }

        async fn wait_for_receipt(&self, tx_hash: TxHash) -> Result<TxReceipt, ClientError> {
            self.checkpoint("wait_for_receipt").await?;
            self.chain.wait_for_receipt(tx_hash).await
        }
    }

    fn tokens(n: u64) -> U256 {
        U256::from(n) * one_token()
    }

    fn setup() -> (SwapPanel, Arc<ScriptedPool>, Arc<SimChain>) {
        setup_with(SimChain::default_contracts())
    }

    fn setup_with(contracts: Contracts) -> (SwapPanel, Arc<ScriptedPool>, Arc<SimChain>) {
        let chain = Arc::new(SimChain::new(contracts));
        let pool = Arc::new(ScriptedPool::new(chain.clone()));
        let panel =
            SwapPanel::new(pool.clone(), Some(chain.clone()), contracts, SimChain::CHAIN_ID);
        (panel, pool, chain)
    }

    // ------------------------------------------------------------------------
    // Session and reads
    // ------------------------------------------------------------------------

    #[tokio::test]
    async fn test_connect_sets_account_and_reserves() {
        let (panel, _pool, chain) = setup();
        let account = panel.connect().await.unwrap();

        assert_eq!(account, chain.account());
        let state = panel.snapshot();
        assert_eq!(state.account, Some(account));
        assert_eq!(state.reserves.a, "1000.0");
        assert_eq!(state.reserves.b, "2000.0");
    }

    #[tokio::test]
    async fn test_connect_without_wallet_leaves_session_empty() {
        let chain = Arc::new(SimChain::new(SimChain::default_contracts()));
        let panel = SwapPanel::new(chain, None, SimChain::default_contracts(), SimChain::CHAIN_ID);

        let result = panel.connect().await;
        assert!(matches!(result, Err(PanelError::Wallet(WalletError::NotDetected))));
        assert_eq!(panel.account(), None);
    }

    #[tokio::test]
    async fn test_connect_ignores_rejected_network_switch() {
        let contracts = SimChain::default_contracts();
        let chain = Arc::new(SimChain::new(contracts));
        let panel = SwapPanel::new(chain.clone(), Some(chain.clone()), contracts, 1);

        assert_eq!(panel.connect().await.unwrap(), chain.account());
    }

    #[tokio::test]
    async fn test_show_price() {
        let (panel, _pool, _chain) = setup();
        assert_eq!(panel.show_price().await.unwrap(), "2.0");
        assert_eq!(panel.snapshot().price.as_deref(), Some("2.0"));
    }

    #[tokio::test]
    async fn test_read_errors_propagate() {
        let (panel, pool, _chain) = setup();
        panel.connect().await.unwrap();
        pool.fail_on("get_reserves");
        assert!(matches!(panel.refresh_reserves().await, Err(PanelError::Client(_))));
    }

    // ------------------------------------------------------------------------
    // Quotes
    // ------------------------------------------------------------------------

    #[tokio::test]
    async fn test_quote_reference_scenario() {
        let (panel, _pool, _chain) = setup();
        panel.connect().await.unwrap();

        let update = panel.update_swap_input("10").await.unwrap();
        let QuoteUpdate::Applied(quote) = update else {
            panic!("expected a quote, got {:?}", update);
        };
        assert_eq!(quote.amount_in_wei, tokens(10));
        assert_eq!(quote.amount_out, U256::from_dec_str("19801980198019801980").unwrap());
        assert_eq!(quote.amount_out_display, "19.80198019801980198");
    }

    #[tokio::test]
    async fn test_empty_input_clears_quote_without_reads() {
        let (panel, pool, _chain) = setup();
        panel.connect().await.unwrap();
        panel.update_swap_input("10").await.unwrap();
        pool.clear_calls();

        assert_eq!(panel.update_swap_input("").await.unwrap(), QuoteUpdate::Cleared);
        assert!(pool.calls().is_empty());
        assert!(panel.snapshot().quote.is_none());
    }

    #[tokio::test]
    async fn test_input_without_account_does_not_read() {
        let (panel, pool, _chain) = setup();
        assert_eq!(panel.update_swap_input("10").await.unwrap(), QuoteUpdate::Cleared);
        assert!(pool.calls().is_empty());
        assert_eq!(panel.snapshot().swap_input, "10");
    }

    #[tokio::test]
    async fn test_malformed_input_is_rejected() {
        let (panel, pool, _chain) = setup();
        panel.connect().await.unwrap();
        pool.clear_calls();

        let result = panel.update_swap_input("1e5").await;
        assert!(matches!(result, Err(PanelError::InvalidAmount(_))));
        assert!(pool.calls().is_empty());
        assert!(panel.snapshot().quote.is_none());
    }

    #[tokio::test]
    async fn test_stale_quote_never_overwrites_newer() {
        let (panel, pool, _chain) = setup();
        panel.connect().await.unwrap();

        let release = pool.hold("get_amount_out");
        let (slow, fast, _) = futures::join!(
            panel.update_swap_input("10"),
            panel.update_swap_input("20"),
            async move {
                let _ = release.send(());
            }
        );

        assert_eq!(slow.unwrap(), QuoteUpdate::Stale);
        assert!(matches!(fast.unwrap(), QuoteUpdate::Applied(_)));
        let quote = panel.snapshot().quote.unwrap();
        assert_eq!(quote.amount_in, "20");
        assert_eq!(quote.amount_in_wei, tokens(20));
    }

    #[tokio::test]
    async fn test_input_change_resets_swap_status() {
        let (panel, _pool, _chain) = setup();
        panel.connect().await.unwrap();
        panel.update_swap_input("10").await.unwrap();
        assert!(matches!(panel.execute_swap().await, ActionOutcome::Completed(_)));
        assert!(panel.snapshot().swap.tx_hash.is_some());

        panel.update_swap_input("5").await.unwrap();
        let state = panel.snapshot();
        assert_eq!(state.swap.status, TxStatus::Idle);
        assert!(state.swap.tx_hash.is_none());
    }

    #[tokio::test]
    async fn test_slippage_bounds() {
        let (panel, _pool, _chain) = setup();
        assert_eq!(panel.set_slippage(5).unwrap().percent(), 5);
        assert!(matches!(panel.set_slippage(101), Err(PanelError::Model(_))));
        assert_eq!(panel.snapshot().slippage.percent(), 5);
    }

    // ------------------------------------------------------------------------
    // Swap
    // ------------------------------------------------------------------------

    #[tokio::test]
    async fn test_swap_submits_slippage_floor() {
        let (panel, pool, chain) = setup();
        let account = panel.connect().await.unwrap();
        panel.update_swap_input("10").await.unwrap();
        pool.clear_calls();

        let outcome = panel.execute_swap().await;
        let ActionOutcome::Completed(receipt) = outcome else {
            panic!("swap did not complete: {:?}", outcome);
        };

        assert_eq!(pool.calls(), ["approve", "wait_for_receipt", "submit", "wait_for_receipt"]);

        let submitted = pool.submitted.lock().clone();
        let PoolCall::Swap(args) = &submitted[0] else {
            panic!("expected a swap call");
        };
        assert_eq!(args.amount_in, tokens(10));
        assert_eq!(args.amount_out_min, U256::from_dec_str("19603960396039603960").unwrap());
        assert_eq!(args.path, vec![chain.contracts().token_a, chain.contracts().token_b]);
        assert_eq!(args.to, account);
        assert_eq!(args.deadline, U256::zero());

        let state = panel.snapshot();
        assert_eq!(state.swap.status, TxStatus::Success("Swap complete!".to_string()));
        assert_eq!(state.swap.tx_hash, Some(receipt.tx_hash));
        assert!(state.quote.is_none(), "a completed swap invalidates the quote");
    }

    #[tokio::test]
    async fn test_swap_disconnected_is_noop() {
        let (panel, pool, _chain) = setup();
        assert_eq!(panel.execute_swap().await, ActionOutcome::Skipped(SkipReason::NotConnected));
        assert!(pool.calls().is_empty());
    }

    #[tokio::test]
    async fn test_swap_without_quote_is_noop() {
        let (panel, pool, _chain) = setup();
        panel.connect().await.unwrap();
        pool.clear_calls();
        assert_eq!(panel.execute_swap().await, ActionOutcome::Skipped(SkipReason::NoQuote));
        assert!(pool.calls().is_empty());
    }

    #[tokio::test]
    async fn test_failed_approval_blocks_swap() {
        let (panel, pool, _chain) = setup();
        panel.connect().await.unwrap();
        panel.update_swap_input("10").await.unwrap();
        pool.fail_on("approve");

        let outcome = panel.execute_swap().await;
        let ActionOutcome::Failed(message) = outcome else {
            panic!("expected failure, got {:?}", outcome);
        };
        assert!(message.starts_with("Swap failed: "));
        assert!(message.contains("approve rejected"));
        assert!(!pool.calls().contains(&"submit".to_string()));
        assert_eq!(panel.snapshot().swap.status, TxStatus::Failure(message));
    }

    #[tokio::test]
    async fn test_price_move_reverts_swap_but_keeps_approval() {
        let (panel, _pool, chain) = setup();
        let account = panel.connect().await.unwrap();
        panel.set_slippage(0).unwrap();
        panel.update_swap_input("10").await.unwrap();

        // another trader moves the price between quote and swap
        chain.trade_as_outsider(tokens(50), true).unwrap();

        let outcome = panel.execute_swap().await;
        let ActionOutcome::Failed(message) = outcome else {
            panic!("expected failure, got {:?}", outcome);
        };
        assert!(message.contains("insufficient output amount"));
        let contracts = chain.contracts();
        assert_eq!(chain.allowance(contracts.token_a, account, contracts.pool), tokens(10));
    }

    #[tokio::test]
    async fn test_second_swap_while_pending_is_noop() {
        let (panel, pool, _chain) = setup();
        panel.connect().await.unwrap();
        panel.update_swap_input("10").await.unwrap();

        let release = pool.hold("approve");
        let (first, second, _) =
            futures::join!(panel.execute_swap(), panel.execute_swap(), async move {
                let _ = release.send(());
            });

        assert!(matches!(first, ActionOutcome::Completed(_)));
        assert_eq!(second, ActionOutcome::Skipped(SkipReason::InFlight));
        assert!(!panel.is_busy(ActionKind::Swap));
        assert_eq!(pool.submitted.lock().len(), 1);
    }

    #[tokio::test]
    async fn test_swap_marks_pending_before_receipt() {
        let (panel, pool, _chain) = setup();
        panel.connect().await.unwrap();
        panel.update_swap_input("10").await.unwrap();

        // first receipt wait is the approval, second is the swap itself
        let release = pool.hold_nth("wait_for_receipt", 1);
        let (outcome, seen) = futures::join!(panel.execute_swap(), async {
            let status = panel.snapshot().swap.status;
            let _ = release.send(());
            status
        });

        assert_eq!(seen, TxStatus::Pending("Swapping…".to_string()));
        assert!(matches!(outcome, ActionOutcome::Completed(_)));
    }

    #[tokio::test]
    async fn test_quote_typed_during_swap_survives_completion() {
        let (panel, pool, _chain) = setup();
        panel.connect().await.unwrap();
        panel.update_swap_input("10").await.unwrap();

        let release = pool.hold_nth("wait_for_receipt", 1);
        let (outcome, update) = futures::join!(panel.execute_swap(), async {
            let update = panel.update_swap_input("5").await.unwrap();
            let _ = release.send(());
            update
        });

        assert!(matches!(outcome, ActionOutcome::Completed(_)));
        assert!(matches!(update, QuoteUpdate::Applied(_)));
        let state = panel.snapshot();
        assert_eq!(state.swap_input, "5");
        assert_eq!(state.quote.map(|q| q.amount_in), Some("5".to_string()));
    }

    // ------------------------------------------------------------------------
    // Liquidity
    // ------------------------------------------------------------------------

    #[tokio::test]
    async fn test_add_liquidity_approves_both_tokens() {
        let (panel, pool, _chain) = setup();
        let account = panel.connect().await.unwrap();
        pool.clear_calls();

        let outcome = panel.add_liquidity("1", "2", LiquidityLimits::default()).await;
        assert!(matches!(outcome, ActionOutcome::Completed(_)), "{:?}", outcome);

        let calls = pool.calls();
        assert_eq!(&calls[..4], &["approve", "wait_for_receipt", "approve", "wait_for_receipt"]);

        let submitted = pool.submitted.lock().clone();
        let PoolCall::AddLiquidity(args) = &submitted[0] else {
            panic!("expected addLiquidity");
        };
        assert_eq!(args.amount_a_desired, tokens(1));
        assert_eq!(args.amount_b_desired, tokens(2));
        assert_eq!(args.amount_a_min, U256::zero());
        assert_eq!(args.to, account);

        let state = panel.snapshot();
        assert_eq!(state.add_liquidity.status, TxStatus::Success("Liquidity added!".to_string()));
        assert_eq!(state.reserves.a, "1001.0");
        assert_eq!(state.reserves.b, "2002.0");
    }

    #[tokio::test]
    async fn test_add_liquidity_guards() {
        let (panel, pool, _chain) = setup();
        assert_eq!(
            panel.add_liquidity("1", "2", LiquidityLimits::default()).await,
            ActionOutcome::Skipped(SkipReason::NotConnected)
        );
        panel.connect().await.unwrap();
        pool.clear_calls();
        assert_eq!(
            panel.add_liquidity("1", "", LiquidityLimits::default()).await,
            ActionOutcome::Skipped(SkipReason::MissingAmount)
        );
        assert!(pool.calls().is_empty());
    }

    #[tokio::test]
    async fn test_failed_approval_blocks_add_liquidity() {
        let (panel, pool, _chain) = setup();
        panel.connect().await.unwrap();
        pool.fail_on("approve");

        let outcome = panel.add_liquidity("1", "2", LiquidityLimits::default()).await;
        let ActionOutcome::Failed(message) = outcome else {
            panic!("expected failure");
        };
        assert!(message.starts_with("Add liquidity failed: "));
        assert!(pool.submitted.lock().is_empty());
    }

    #[tokio::test]
    async fn test_add_liquidity_minimums_are_forwarded() {
        let (panel, _pool, _chain) = setup();
        panel.connect().await.unwrap();

        // asks for at least 3 B but the ratio only takes 2
        let limits = LiquidityLimits {
            min_a: U256::zero(),
            min_b: tokens(3),
        };
        let outcome = panel.add_liquidity("1", "5", limits).await;
        assert!(
            matches!(outcome, ActionOutcome::Failed(ref msg) if msg.contains("insufficient output"))
        );
    }

    #[tokio::test]
    async fn test_remove_liquidity_round_trip() {
        let (panel, pool, _chain) = setup();
        panel.connect().await.unwrap();
        assert!(matches!(
            panel.add_liquidity("10", "20", LiquidityLimits::default()).await,
            ActionOutcome::Completed(_)
        ));
        pool.clear_calls();

        let outcome = panel.remove_liquidity("1", LiquidityLimits::default()).await;
        assert!(matches!(outcome, ActionOutcome::Completed(_)), "{:?}", outcome);
        assert_eq!(pool.calls()[..2], ["preview_remove_liquidity", "submit"]);

        let state = panel.snapshot();
        let removed = TxStatus::Success("Liquidity removed!".to_string());
        assert_eq!(state.remove_liquidity.status, removed);
        let removal = state.removal.unwrap();
        assert_ne!(removal.a, "0.0");
        assert_ne!(removal.b, "0.0");
    }

    #[tokio::test]
    async fn test_remove_liquidity_approves_configured_lp_token() {
        let mut contracts = SimChain::default_contracts();
        contracts.lp_token = Some(contracts.pool);
        let (panel, pool, _chain) = setup_with(contracts);
        panel.connect().await.unwrap();
        panel.add_liquidity("10", "20", LiquidityLimits::default()).await;
        pool.clear_calls();

        panel.remove_liquidity("1", LiquidityLimits::default()).await;
        assert_eq!(pool.calls()[0], "approve");
    }

    #[tokio::test]
    async fn test_remove_liquidity_failure_is_captured() {
        let (panel, _pool, _chain) = setup();
        panel.connect().await.unwrap();

        // the connected account holds no LP shares yet
        let outcome = panel.remove_liquidity("1", LiquidityLimits::default()).await;
        let ActionOutcome::Failed(message) = outcome else {
            panic!("expected failure");
        };
        assert!(message.starts_with("Remove liquidity failed: "));
        assert!(panel.snapshot().removal.is_none());
    }

    #[tokio::test]
    async fn test_disconnected_liquidity_actions_are_noops() {
        let (panel, pool, _chain) = setup();
        assert_eq!(
            panel.remove_liquidity("1", LiquidityLimits::default()).await,
            ActionOutcome::Skipped(SkipReason::NotConnected)
        );
        assert!(pool.calls().is_empty());
    }

    #[tokio::test]
    async fn test_add_liquidity_marks_pending_before_receipt() {
        let (panel, pool, _chain) = setup();
        panel.connect().await.unwrap();

        // two approval receipts come first
        let release = pool.hold_nth("wait_for_receipt", 2);
        let add = panel.add_liquidity("1", "2", LiquidityLimits::default());
        let (outcome, seen) = futures::join!(add, async {
            let status = panel.snapshot().add_liquidity.status;
            let _ = release.send(());
            status
        });

        assert_eq!(seen, TxStatus::Pending("Adding liquidity…".to_string()));
        assert!(matches!(outcome, ActionOutcome::Completed(_)));
    }

    #[tokio::test]
    async fn test_second_add_liquidity_while_pending_is_noop() {
        let (panel, pool, _chain) = setup();
        panel.connect().await.unwrap();

        let release = pool.hold("approve");
        let limits = LiquidityLimits::default();
        let (first, second, _) = futures::join!(
            panel.add_liquidity("1", "2", limits),
            panel.add_liquidity("1", "2", limits),
            async move {
                let _ = release.send(());
            }
        );

        assert!(matches!(first, ActionOutcome::Completed(_)));
        assert_eq!(second, ActionOutcome::Skipped(SkipReason::InFlight));
        assert!(!panel.is_busy(ActionKind::AddLiquidity));
        assert_eq!(pool.submitted.lock().len(), 1);
    }

    #[tokio::test]
    async fn test_remove_liquidity_marks_pending_before_receipt() {
        let (panel, pool, _chain) = setup();
        panel.connect().await.unwrap();
        panel.add_liquidity("10", "20", LiquidityLimits::default()).await;

        // no LP token configured, so the only receipt wait is the removal
        let release = pool.hold("wait_for_receipt");
        let remove = panel.remove_liquidity("1", LiquidityLimits::default());
        let (outcome, seen) = futures::join!(remove, async {
            let status = panel.snapshot().remove_liquidity.status;
            let _ = release.send(());
            status
        });

        assert_eq!(seen, TxStatus::Pending("Removing liquidity…".to_string()));
        assert!(matches!(outcome, ActionOutcome::Completed(_)));
    }

    #[tokio::test]
    async fn test_second_remove_liquidity_while_pending_is_noop() {
        let (panel, pool, _chain) = setup();
        panel.connect().await.unwrap();
        panel.add_liquidity("10", "20", LiquidityLimits::default()).await;
        pool.submitted.lock().clear();

        let release = pool.hold("preview_remove_liquidity");
        let limits = LiquidityLimits::default();
        let (first, second, _) = futures::join!(
            panel.remove_liquidity("1", limits),
            panel.remove_liquidity("1", limits),
            async move {
                let _ = release.send(());
            }
        );

        assert!(matches!(first, ActionOutcome::Completed(_)));
        assert_eq!(second, ActionOutcome::Skipped(SkipReason::InFlight));
        assert!(!panel.is_busy(ActionKind::RemoveLiquidity));
        assert_eq!(pool.submitted.lock().len(), 1);
    }

    #[tokio::test]
    async fn test_full_removal_refreshes_reserves() {
        let (panel, _pool, chain) = setup();
        let account = panel.connect().await.unwrap();
        panel.add_liquidity("10", "20", LiquidityLimits::default()).await;
        assert_eq!(panel.snapshot().reserves.a, "1010.0");

        let shares = format_units(chain.shares_of(account));
        let outcome = panel.remove_liquidity(&shares, LiquidityLimits::default()).await;
        assert!(matches!(outcome, ActionOutcome::Completed(_)), "{:?}", outcome);
        assert!(chain.shares_of(account).is_zero());

        // rounding stays in the pool, so reserves land at or just above genesis
        let c = SimChain::default_contracts();
        let (reserve_a, reserve_b) = chain.get_reserves(c.token_a, c.token_b).await.unwrap();
        assert!(reserve_a >= tokens(1000) && reserve_a - tokens(1000) < U256::from(1_000u64));
        assert!(reserve_b >= tokens(2000) && reserve_b - tokens(2000) < U256::from(1_000u64));

        let state = panel.snapshot();
        assert_eq!(state.reserves.a, format_units(reserve_a));
        assert_eq!(state.reserves.b, format_units(reserve_b));
    }
}
