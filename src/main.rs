#![allow(warnings)]

//! Process entry point (§13): parses CLI flags, loads configuration, builds
//! the shared `Providers`, wires the task graph of §5, and runs until a
//! shutdown signal or a task exits unexpectedly.

use clap::Parser;
use copytrader_core::agent::{Agent, AgentConfig};
use copytrader_core::config;
use copytrader_core::discovery::{Discovery, Maintenance};
use copytrader_core::events::{EventChannels, HunterEvicted};
use copytrader_core::hunters::WalletLineList;
use copytrader_core::logger::{self, LogLevel, LogTag};
use copytrader_core::monitor::{Monitor, MonitorConfig};
use copytrader_core::paths;
use copytrader_core::positions::PositionStore;
use copytrader_core::providers::Providers;
use copytrader_core::trader::Trader;
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(name = "copytrader", about = "Solana hunter copy-trading core")]
struct Args {
    /// Path to config.toml, overriding the platform data directory lookup.
    #[arg(long)]
    config: Option<String>,

    /// Overrides the platform data directory (same effect as
    /// COPYTRADER_DATA_DIR).
    #[arg(long = "data-dir")]
    data_dir: Option<String>,

    /// Build every component and print the startup plan without spawning any
    /// trading task (no swaps are ever submitted).
    #[arg(long = "dry-run")]
    dry_run: bool,

    /// error | warning | info | debug | verbose
    #[arg(long = "log-level")]
    log_level: Option<String>,
}

static SHUTDOWN: AtomicBool = AtomicBool::new(false);

fn main() -> ExitCode {
    let args = Args::parse();

    if let Some(dir) = &args.data_dir {
        std::env::set_var("COPYTRADER_DATA_DIR", dir);
    }

    logger::init();
    apply_log_level_override(args.log_level.as_deref());

    if let Err(e) = paths::ensure_all_directories() {
        eprintln!("failed to prepare data directories: {}", e);
        return ExitCode::FAILURE;
    }

    let load_result = match &args.config {
        Some(path) => config::load_config_from_path(path),
        None => config::load_config(),
    };
    if let Err(e) = load_result {
        logger::error(LogTag::Config, &format!("failed to load configuration: {}", e));
        return ExitCode::FAILURE;
    }

    let signer = match config::get_signer_keypair() {
        Ok(kp) => kp,
        Err(e) => {
            logger::error(LogTag::Config, &format!("failed to load signer keypair: {}", e));
            return ExitCode::FAILURE;
        }
    };

    ctrlc::set_handler(|| {
        logger::info(LogTag::Trader, "shutdown signal received, draining in-flight work");
        SHUTDOWN.store(true, Ordering::SeqCst);
    })
    .expect("failed to install ctrlc handler");

    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("failed to start tokio runtime: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let result = runtime.block_on(run(args.dry_run, signer));
    logger::flush();
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            logger::error(LogTag::Trader, &format!("fatal: {}", e));
            logger::flush();
            ExitCode::FAILURE
        }
    }
}

fn apply_log_level_override(level: Option<&str>) {
    let Some(level) = level else { return };
    match LogLevel::from_str(level) {
        Some(min_level) => logger::update_logger_config(|cfg| cfg.min_level = min_level),
        None => logger::warning(LogTag::Config, &format!("unrecognized --log-level '{}', keeping default", level)),
    }
}

fn now_secs() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

async fn run(dry_run: bool, signer: solana_sdk::signature::Keypair) -> Result<(), String> {
    let cfg = config::get_config_clone();
    let providers = Providers::build(&cfg, signer);

    let position_store = Arc::new(PositionStore::load(paths::get_trader_state_path()).await);
    let wallet_trash = Arc::new(WalletLineList::new(paths::get_wallet_trash_path()));

    let events = EventChannels::new();
    let EventChannels {
        resonance_tx,
        mut resonance_rx,
        hunter_delta_tx,
        hunter_delta_rx,
        agent_signal_tx,
        mut agent_signal_rx,
        credit_exhausted_tx,
        credit_exhausted_rx,
        hunter_evicted_tx,
        hunter_evicted_rx,
        position_closed_tx,
        mut position_closed_rx,
    } = events;

    let discovery = Discovery::new(
        providers.chain.clone(),
        providers.hunter_store.clone(),
        providers.hot_sources.clone(),
        providers.price_oracle.clone(),
        paths::get_scanned_tokens_path(),
        paths::get_wallet_trash_path(),
        cfg.discovery.clone(),
    );

    let maintenance = Maintenance::new(
        providers.chain.clone(),
        providers.hunter_store.clone(),
        paths::get_wallet_trash_path(),
        cfg.discovery.clone(),
        cfg.intervals.zombie_threshold_secs,
        Box::new(move |wallet: &str| {
            let _ = hunter_evicted_tx.try_send(HunterEvicted { wallet: wallet.to_string() });
        }),
    );

    let monitor = Arc::new(Monitor::new(
        providers.chain.clone(),
        providers.hunter_store.clone(),
        position_store.clone(),
        wallet_trash.clone(),
        providers.price_oracle.clone(),
        MonitorConfig {
            ws_urls: cfg.providers.ws_urls.clone(),
            ws_resubscribe_secs: cfg.intervals.ws_resubscribe_secs,
            batch_drain_timeout_ms: cfg.intervals.batch_drain_timeout_ms,
            batch_size: cfg.intervals.batch_size,
            recent_sig_ttl_secs: cfg.intervals.recent_sig_ttl_secs,
            holdings_prune_interval_secs: cfg.intervals.holdings_prune_interval_secs,
            holdings_ttl_secs: cfg.intervals.holdings_ttl_secs,
            max_entry_pump_multiplier: cfg.policy.max_entry_pump_multiplier,
        },
        resonance_tx,
        hunter_delta_tx,
        credit_exhausted_tx,
    ));

    let agent = Arc::new(Agent::new(
        providers.chain.clone(),
        AgentConfig {
            sync_interval_secs: cfg.intervals.sync_interval_secs,
            sync_protection_secs: cfg.intervals.sync_protection_secs,
            sync_min_delta_ratio_pct: cfg.policy.sync_min_delta_ratio_pct,
        },
        agent_signal_tx,
    ));

    let trader = Arc::new(Trader::new(
        providers.chain.clone(),
        providers.swap.clone(),
        providers.risk_gate.clone(),
        position_store.clone(),
        providers.hunter_store.clone(),
        providers.price_oracle.clone(),
        providers.trading_history.clone(),
        providers.signer.clone(),
        cfg.tiers.clone(),
        cfg.take_profit.clone(),
        cfg.policy.clone(),
        cfg.slippage.clone(),
        position_closed_tx,
    ));

    if dry_run {
        logger::info(LogTag::Trader, "dry run: providers and task graph constructed successfully, exiting without trading");
        return Ok(());
    }

    let mut tasks = tokio::task::JoinSet::new();

    {
        let discovery = Arc::new(discovery);
        let hunter_store = providers.hunter_store.clone();
        let interval_secs = cfg.intervals.discovery_interval_secs;
        let interval_when_full_secs = cfg.intervals.discovery_interval_when_full_secs;
        let pool_limit = cfg.discovery.pool_limit;
        tasks.spawn(async move {
            loop {
                discovery.run_hot_token_cycle(now_secs()).await;
                discovery.run_curated_list_cycle(now_secs()).await;
                let sleep_secs = if hunter_store.addresses().len() >= pool_limit { interval_when_full_secs } else { interval_secs };
                tokio::time::sleep(tokio::time::Duration::from_secs(sleep_secs)).await;
            }
        });
    }

    {
        let maintenance = Arc::new(maintenance);
        let interval_secs = cfg.intervals.maintenance_interval_secs;
        let audit_expiration_secs = cfg.intervals.audit_expiration_secs;
        tasks.spawn(async move {
            loop {
                maintenance.run_cycle(now_secs(), audit_expiration_secs).await;
                tokio::time::sleep(tokio::time::Duration::from_secs(interval_secs)).await;
            }
        });
    }

    {
        let (sig_tx, sig_rx) = tokio::sync::mpsc::channel::<String>(4096);
        let sub_monitor = monitor.clone();
        tasks.spawn(async move { sub_monitor.run_subscription(sig_tx).await });

        let consume_monitor = monitor.clone();
        tasks.spawn(async move { consume_monitor.run_consumer(sig_rx).await });

        let prune_monitor = monitor.clone();
        tasks.spawn(async move { prune_monitor.run_holdings_prune().await });
    }

    {
        let delta_agent = agent.clone();
        tasks.spawn(async move { delta_agent.run_delta_consumer(hunter_delta_rx).await });

        let sync_agent = agent.clone();
        tasks.spawn(async move { sync_agent.run_reconciliation().await });
    }

    {
        let resonance_trader = trader.clone();
        tasks.spawn(async move {
            while let Some(signal) = resonance_rx.recv().await {
                resonance_trader.handle_resonance(signal).await;
            }
        });

        let signal_trader = trader.clone();
        tasks.spawn(async move {
            while let Some(signal) = agent_signal_rx.recv().await {
                signal_trader.handle_agent_signal(signal).await;
            }
        });

        let pnl_trader = trader.clone();
        let pnl_interval_secs = cfg.intervals.pnl_check_interval_secs;
        tasks.spawn(async move { pnl_trader.run_pnl_loop(pnl_interval_secs).await });

        let emergency_trader = trader.clone();
        tasks.spawn(async move { emergency_trader.run_emergency_close_all(credit_exhausted_rx).await });

        let evicted_trader = trader.clone();
        tasks.spawn(async move { evicted_trader.run_hunter_evicted_consumer(hunter_evicted_rx).await });
    }

    tasks.spawn(async move {
        while position_closed_rx.recv().await.is_some() {
            // trading_history.jsonl already has the durable record; the
            // external report collaborator (§6, out of scope here) tails it.
        }
    });

    tokio::select! {
        _ = wait_for_shutdown_signal() => {
            logger::info(LogTag::Trader, "shutting down: in-flight swaps are allowed to finish");
        }
        result = tasks.join_next() => {
            if let Some(Err(e)) = result {
                return Err(format!("a task exited unexpectedly: {}", e));
            }
            return Err("a task exited unexpectedly".to_string());
        }
    }

    Ok(())
}

async fn wait_for_shutdown_signal() {
    loop {
        if SHUTDOWN.load(Ordering::SeqCst) {
            return;
        }
        tokio::time::sleep(tokio::time::Duration::from_millis(200)).await;
    }
}
