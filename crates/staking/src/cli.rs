//! `dsdn-staking` command line: replay a scripted scenario against an
//! in-memory token and print the resulting ledger.
//!
//! ## Script format (JSON)
//!
//! ```json
//! {
//!   "accounts": [{ "label": "alice", "balance": "1000000000000000000000000" }],
//!   "reward_vault_balance": "100000000000000000000000000",
//!   "steps": [
//!     { "at": 0, "op": { "Register": { "owner": "alice", "node": "node-1",
//!         "amount": "1000000000000000000000000", "commission_bps": 1000, "description": "" } } },
//!     { "at": 0, "op": { "Start": { "node": "node-1" } } },
//!     { "at": 31536000, "op": { "NodeClaimReward": { "owner": "alice", "node": "node-1" } } }
//!   ]
//! }
//! ```
//!
//! Accounts are 40-char hex addresses or labels; a label maps to
//! `Address::from_label`. Every listed account approves the ledger without
//! limit. Start/Stop run as the configured health reporter and
//! `SetCirculatingSupply` as the configured admin.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use dsdn_common::types::amount_serde;
use dsdn_common::{config, Address, InMemoryToken, LedgerConfig, TokenLedger};

use crate::events::LedgerEvent;
use crate::state::{NodeStatus, StakingLedger};

// ------------------- COMMAND LINE -------------------

#[derive(Parser, Debug)]
#[command(name = "dsdn-staking", about = "DSDN staking ledger tools")]
pub struct Cli {
    /// Log filter, e.g. "info" or "dsdn_staking=debug"
    #[arg(long, default_value = "info")]
    pub log: String,

    #[command(subcommand)]
    pub cmd: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Replay a JSON scenario and print events plus a summary
    Replay {
        /// Ledger config (TOML). Defaults apply when omitted.
        #[arg(long)]
        config: Option<PathBuf>,
        #[arg(long)]
        script: PathBuf,
        /// Abort on the first rejected step instead of logging it
        #[arg(long, default_value_t = false)]
        fail_fast: bool,
    },
    /// Print the default config as TOML
    DefaultConfig,
}

// ------------------- SCRIPT -------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Script {
    #[serde(default)]
    pub accounts: Vec<AccountSpec>,
    #[serde(default, with = "amount_serde")]
    pub reward_vault_balance: u128,
    pub steps: Vec<Step>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountSpec {
    pub label: String,
    #[serde(with = "amount_serde")]
    pub balance: u128,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Step {
    /// Unix seconds
    pub at: u64,
    pub op: ScriptOp,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ScriptOp {
    Register {
        owner: String,
        node: String,
        #[serde(with = "amount_serde")]
        amount: u128,
        commission_bps: u64,
        #[serde(default)]
        description: String,
    },
    Start { node: String },
    Stop { node: String },
    Unregister { owner: String, node: String },
    UpdateStake {
        owner: String,
        node: String,
        #[serde(with = "amount_serde")]
        new_amount: u128,
        #[serde(default)]
        description: String,
        commission_bps: u64,
    },
    Delegate {
        delegator: String,
        node: String,
        #[serde(with = "amount_serde")]
        amount: u128,
    },
    Unbond {
        staker: String,
        node: String,
        #[serde(with = "amount_serde")]
        amount: u128,
    },
    NodeWithdraw { owner: String, node: String },
    DelegatorWithdraw { delegator: String, node: String },
    NodeClaimReward { owner: String, node: String },
    DelegatorClaimReward { delegator: String, node: String },
    SetCirculatingSupply {
        #[serde(with = "amount_serde")]
        supply: u128,
    },
}

/// Hex address, or a label hashed into one.
pub fn resolve_account(s: &str) -> Address {
    Address::from_hex(s).unwrap_or_else(|_| Address::from_label(s))
}

pub fn load_script(path: &Path) -> Result<Script> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading script {}", path.display()))?;
    let script: Script = serde_json::from_str(&raw)
        .with_context(|| format!("parsing script {}", path.display()))?;
    Ok(script)
}

// ------------------- REPLAY -------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeSummary {
    pub node: Address,
    pub owner: Address,
    pub status: NodeStatus,
    #[serde(with = "amount_serde")]
    pub self_stake: u128,
    #[serde(with = "amount_serde")]
    pub total_delegated: u128,
    pub commission_bps: u64,
    pub uptime_secs: u64,
    #[serde(with = "amount_serde")]
    pub claimable: u128,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplaySummary {
    pub steps_applied: usize,
    pub rejected: Vec<RejectedStep>,
    #[serde(with = "amount_serde")]
    pub total_active_stake: u128,
    pub apr_bps: u64,
    pub active_nodes: Vec<Address>,
    pub nodes: Vec<NodeSummary>,
    /// label → balance as decimal string
    pub balances: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RejectedStep {
    pub index: usize,
    pub at: u64,
    pub error: String,
}

#[derive(Debug)]
pub struct ReplayOutcome {
    pub events: Vec<LedgerEvent>,
    pub summary: ReplaySummary,
}

/// Run `script` against a fresh ledger.
pub fn replay(cfg: LedgerConfig, script: &Script, fail_fast: bool) -> Result<ReplayOutcome> {
    cfg.validate().context("invalid ledger config")?;
    let ledger_account = cfg.ledger_account;
    let vault = cfg.reward_vault;
    let reporter = cfg.health_reporter;
    let admin = cfg.admin;

    let mut token = InMemoryToken::new();
    token.mint(&vault, script.reward_vault_balance)?;
    token.approve(&vault, &ledger_account, u128::MAX);
    for acct in &script.accounts {
        let addr = resolve_account(&acct.label);
        token.mint(&addr, acct.balance)?;
        token.approve(&addr, &ledger_account, u128::MAX);
    }

    let mut ledger = StakingLedger::new(cfg, token);
    let mut events = Vec::new();
    let mut rejected = Vec::new();
    let mut applied = 0usize;

    for (index, step) in script.steps.iter().enumerate() {
        let now = step.at;
        let result = match &step.op {
            ScriptOp::Register { owner, node, amount, commission_bps, description } => ledger.register(
                &resolve_account(owner),
                &resolve_account(node),
                *amount,
                *commission_bps,
                description.clone(),
                now,
            ),
            ScriptOp::Start { node } => ledger.start(&reporter, &resolve_account(node), now),
            ScriptOp::Stop { node } => ledger.stop(&reporter, &resolve_account(node), now),
            ScriptOp::Unregister { owner, node } => {
                ledger.unregister(&resolve_account(owner), &resolve_account(node), now)
            }
            ScriptOp::UpdateStake { owner, node, new_amount, description, commission_bps } => ledger
                .update_stake(
                    &resolve_account(owner),
                    &resolve_account(node),
                    *new_amount,
                    description.clone(),
                    *commission_bps,
                    now,
                ),
            ScriptOp::Delegate { delegator, node, amount } => {
                ledger.delegate(&resolve_account(delegator), &resolve_account(node), *amount, now)
            }
            ScriptOp::Unbond { staker, node, amount } => ledger
                .unbond(&resolve_account(staker), &resolve_account(node), *amount, now)
                .map(|_| ()),
            ScriptOp::NodeWithdraw { owner, node } => ledger
                .node_withdraw(&resolve_account(owner), &resolve_account(node), now)
                .map(|_| ()),
            ScriptOp::DelegatorWithdraw { delegator, node } => ledger
                .delegator_withdraw(&resolve_account(delegator), &resolve_account(node), now)
                .map(|_| ()),
            ScriptOp::NodeClaimReward { owner, node } => ledger
                .node_claim_reward(&resolve_account(owner), &resolve_account(node), now)
                .map(|_| ()),
            ScriptOp::DelegatorClaimReward { delegator, node } => ledger
                .delegator_claim_reward(&resolve_account(delegator), &resolve_account(node), now)
                .map(|_| ()),
            ScriptOp::SetCirculatingSupply { supply } => ledger.set_circulating_supply(&admin, *supply, now),
        };

        match result {
            Ok(()) => applied += 1,
            Err(e) if fail_fast => {
                return Err(anyhow::Error::new(e).context(format!("step {} at {} rejected", index, now)));
            }
            Err(e) => {
                warn!(index, at = now, error = %e, "step rejected");
                rejected.push(RejectedStep {
                    index,
                    at: now,
                    error: e.to_string(),
                });
            }
        }
        for ev in ledger.drain_events() {
            info!(kind = ev.kind(), at = ev.timestamp(), "event");
            events.push(ev);
        }
    }

    let now = ledger.last_timestamp();
    let nodes = ledger
        .node_ids()
        .iter()
        .filter_map(|id| ledger.node(id))
        .map(|r| NodeSummary {
            node: r.node,
            owner: r.owner,
            status: r.status,
            self_stake: r.self_stake,
            total_delegated: r.total_delegated,
            commission_bps: r.commission_bps,
            uptime_secs: r.uptime.effective(now),
            claimable: ledger.node_claimable(&r.node, now),
        })
        .collect();

    let mut balances = BTreeMap::new();
    for acct in &script.accounts {
        let bal = ledger.token().balance_of(&resolve_account(&acct.label));
        balances.insert(acct.label.clone(), bal.to_string());
    }
    balances.insert("reward_vault".to_string(), ledger.token().balance_of(&vault).to_string());
    balances.insert(
        "ledger".to_string(),
        ledger.token().balance_of(&ledger_account).to_string(),
    );

    let summary = ReplaySummary {
        steps_applied: applied,
        rejected,
        total_active_stake: ledger.total_active_stake(),
        apr_bps: ledger.current_apr(),
        active_nodes: ledger.node_ids().to_vec(),
        nodes,
        balances,
    };
    Ok(ReplayOutcome { events, summary })
}

/// Execute a parsed command line.
pub fn run(cli: Cli) -> Result<()> {
    match cli.cmd {
        Commands::DefaultConfig => {
            print!("{}", LedgerConfig::default().to_toml()?);
        }
        Commands::Replay { config: cfg_path, script, fail_fast } => {
            let cfg = match cfg_path {
                Some(p) => config::load_from_file(&p)
                    .with_context(|| format!("loading config {}", p.display()))?,
                None => LedgerConfig::default(),
            };
            let script = load_script(&script)?;
            info!(steps = script.steps.len(), "replaying script");
            let outcome = replay(cfg, &script, fail_fast)?;
            for ev in &outcome.events {
                println!("{}", serde_json::to_string(ev)?);
            }
            println!("{}", serde_json::to_string_pretty(&outcome.summary)?);
        }
    }
    Ok(())
}
