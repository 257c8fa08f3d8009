//! CLI definition and dispatch.

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::adapters::csv_report_adapter::CsvReportAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::json_report_adapter::JsonReportAdapter;
use crate::adapters::json_store_adapter::JsonStoreAdapter;
use crate::domain::backtest::{BacktestConfig, BacktestResult, run_backtest};
use crate::domain::config_validation::{validate_backtest_config, validate_portfolio_config};
use crate::domain::error::FxlabError;
use crate::domain::instrument::{CURRENCY_PAIRS, PriceTable, parse_pair};
use crate::domain::portfolio::{DEFAULT_INITIAL_BALANCE, OpenTrade, Portfolio, estimated_value};
use crate::domain::random;
use crate::domain::strategy::Strategy;
use crate::domain::trade::{PaperTrade, TradeType};
use crate::ports::config_port::ConfigPort;
use crate::ports::portfolio_store::PortfolioStore;
use crate::ports::report_port::ReportPort;

#[derive(Parser, Debug)]
#[command(name = "fxlab", about = "Forex backtest simulator and paper-trading ledger")]
pub struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a simulated backtest
    Backtest {
        #[arg(short, long)]
        config: PathBuf,
        /// Seed for a reproducible run (overrides [backtest] seed)
        #[arg(long)]
        seed: Option<u64>,
        #[arg(long)]
        pair: Option<String>,
        #[arg(long)]
        strategy: Option<String>,
        /// Write the result to a .csv (trade list) or .json (full result) file
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[arg(long)]
        dry_run: bool,
    },
    /// Validate a configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Manage the paper-trading portfolio
    Paper {
        /// Portfolio state file (created on first use)
        #[arg(short, long)]
        state: PathBuf,
        #[arg(short, long)]
        config: Option<PathBuf>,
        #[command(subcommand)]
        action: PaperAction,
    },
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum PaperAction {
    /// Open a trade
    Open {
        #[arg(long)]
        pair: String,
        /// buy or sell
        #[arg(long)]
        side: String,
        /// Size in standard lots
        #[arg(long)]
        quantity: f64,
        /// Entry price; defaults to the pair's mark price
        #[arg(long)]
        price: Option<f64>,
        #[arg(long)]
        take_profit: Option<f64>,
        #[arg(long)]
        stop_loss: Option<f64>,
        /// Starting balance when the state file does not exist yet
        #[arg(long)]
        initial_balance: Option<f64>,
    },
    /// Close an open trade
    Close {
        #[arg(long)]
        id: u64,
        /// Exit price; defaults to the pair's mark price
        #[arg(long)]
        price: Option<f64>,
    },
    /// Restore the starting balance and cancel open trades
    Reset,
    /// Show balance, statistics and open positions
    Status,
}

/// What a paper action did, for the caller to report.
#[derive(Debug, Clone, PartialEq)]
pub enum PaperOutcome {
    Opened(PaperTrade),
    Closed(PaperTrade),
    Reset { cancelled: usize },
    Status(Portfolio),
}

/// Command-line values that take precedence over the config file.
#[derive(Debug, Clone, Default)]
pub struct BacktestOverrides {
    pub pair: Option<String>,
    pub strategy: Option<String>,
}

/// `[backtest]` as the run will see it: command-line values replace the
/// file's strategy, currency_pair and seed.
struct LayeredConfig<'a> {
    base: &'a dyn ConfigPort,
    overrides: &'a BacktestOverrides,
    seed: Option<u64>,
}

impl ConfigPort for LayeredConfig<'_> {
    fn get_string(&self, section: &str, key: &str) -> Option<String> {
        if section.eq_ignore_ascii_case("backtest") {
            let value = match key.to_ascii_lowercase().as_str() {
                "strategy" => self.overrides.strategy.clone(),
                "currency_pair" => self.overrides.pair.clone(),
                "seed" => self.seed.map(|s| s.to_string()),
                _ => None,
            };
            if value.is_some() {
                return value;
            }
        }
        self.base.get_string(section, key)
    }

    fn get_double(&self, section: &str, key: &str, default: f64) -> f64 {
        self.base.get_double(section, key, default)
    }
}

pub fn init_logging(verbose: bool) {
    let default = if verbose { "fxlab=debug" } else { "fxlab=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    // A second call (tests, embedding) keeps the first subscriber.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

pub fn run(cli: Cli) -> ExitCode {
    init_logging(cli.verbose);

    match cli.command {
        Command::Backtest {
            config,
            seed,
            pair,
            strategy,
            output,
            dry_run,
        } => {
            let overrides = BacktestOverrides { pair, strategy };
            if dry_run {
                run_dry_run(&config, seed, &overrides)
            } else {
                run_backtest_command(&config, seed, &overrides, output.as_deref())
            }
        }
        Command::Validate { config } => run_validate(&config),
        Command::Paper {
            state,
            config,
            action,
        } => run_paper(&state, config.as_deref(), &action),
    }
}

fn fail(err: FxlabError) -> ExitCode {
    error!("{err}");
    (&err).into()
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, FxlabError> {
    FileConfigAdapter::from_file(path).map_err(|e| FxlabError::ConfigParse {
        file: path.display().to_string(),
        reason: e.to_string(),
    })
}

pub fn build_backtest_config(
    adapter: &dyn ConfigPort,
    overrides: &BacktestOverrides,
) -> Result<BacktestConfig, FxlabError> {
    let strategy = match overrides
        .strategy
        .clone()
        .or_else(|| adapter.get_string("backtest", "strategy"))
    {
        Some(raw) => raw.parse::<Strategy>()?,
        None => Strategy::MaCrossover,
    };

    let currency_pair = match overrides
        .pair
        .clone()
        .or_else(|| adapter.get_string("backtest", "currency_pair"))
    {
        Some(raw) => parse_pair(&raw)?,
        None => "EURUSD".to_string(),
    };

    Ok(BacktestConfig {
        strategy,
        currency_pair,
        start_date: adapter.get_date("backtest", "start_date")?,
        end_date: adapter.get_date("backtest", "end_date")?,
        initial_balance: adapter.get_double("backtest", "initial_balance", 10_000.0),
        risk_per_trade: adapter.get_double("backtest", "risk_per_trade", 2.0),
        take_profit: adapter.get_double("backtest", "take_profit", 50.0),
        stop_loss: adapter.get_double("backtest", "stop_loss", 25.0),
    })
}

/// Default price tables with `[base_prices]` and `[prices]` overrides applied.
pub fn build_price_table(adapter: &dyn ConfigPort) -> PriceTable {
    let mut prices = PriceTable::default();
    for pair in CURRENCY_PAIRS {
        if let Ok(Some(base)) = adapter.get_optional_double("base_prices", pair) {
            debug!(pair, base, "base price override");
            prices.set_base(pair, base);
        }
        if let Ok(Some(mark)) = adapter.get_optional_double("prices", pair) {
            debug!(pair, mark, "mark price override");
            prices.set_mark(pair, mark);
        }
    }
    prices
}

pub fn resolve_seed(cli_seed: Option<u64>, adapter: &dyn ConfigPort) -> Option<u64> {
    cli_seed.or_else(|| {
        adapter
            .get_string("backtest", "seed")
            .and_then(|s| s.trim().parse().ok())
    })
}

/// Pick a report writer from the output file extension.
pub fn report_adapter_for(path: &Path) -> Box<dyn ReportPort> {
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("csv") => Box::new(CsvReportAdapter),
        _ => Box::new(JsonReportAdapter),
    }
}

/// Validate the config with overrides applied and build what a run needs.
pub fn prepare_backtest(
    adapter: &dyn ConfigPort,
    cli_seed: Option<u64>,
    overrides: &BacktestOverrides,
) -> Result<(BacktestConfig, PriceTable, Option<u64>), FxlabError> {
    let layered = LayeredConfig {
        base: adapter,
        overrides,
        seed: cli_seed,
    };
    validate_backtest_config(&layered)?;
    let config = build_backtest_config(&layered, &BacktestOverrides::default())?;
    config.validate()?;
    Ok((config, build_price_table(adapter), resolve_seed(cli_seed, adapter)))
}

/// Validate, build and run a backtest from a loaded config.
pub fn backtest_pipeline(
    adapter: &dyn ConfigPort,
    cli_seed: Option<u64>,
    overrides: &BacktestOverrides,
) -> Result<BacktestResult, FxlabError> {
    let (config, prices, seed) = prepare_backtest(adapter, cli_seed, overrides)?;

    info!(
        strategy = config.strategy.key(),
        pair = %config.currency_pair,
        start = %config.start_date,
        end = %config.end_date,
        "running backtest"
    );

    match seed {
        Some(seed) => {
            info!(seed, "using seeded generator");
            run_backtest(&config, &prices, &mut random::seeded(seed))
        }
        None => run_backtest(&config, &prices, &mut random::from_entropy()),
    }
}

pub fn run_backtest_command(
    config_path: &Path,
    cli_seed: Option<u64>,
    overrides: &BacktestOverrides,
    output_path: Option<&Path>,
) -> ExitCode {
    info!("loading config from {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(e) => return fail(e),
    };

    let result = match backtest_pipeline(&adapter, cli_seed, overrides) {
        Ok(r) => r,
        Err(e) => return fail(e),
    };

    print_backtest_summary(&result);

    if let Some(output) = output_path {
        if let Err(e) = report_adapter_for(output).write(&result, output) {
            return fail(e);
        }
        info!("report written to {}", output.display());
    }
    ExitCode::SUCCESS
}

pub fn format_backtest_summary(result: &BacktestResult) -> String {
    let stats = &result.stats;
    let sign = if result.is_profitable() { "+" } else { "" };
    let mut out = String::new();
    out.push_str(&format!(
        "=== {} on {} ({} to {}) ===\n",
        result.strategy_name, result.currency_pair, result.start_date, result.end_date
    ));
    out.push_str(&format!("Initial Balance:  ${:.2}\n", result.initial_balance));
    out.push_str(&format!(
        "Final Balance:    ${:.2} ({}{:.2}%)\n",
        result.final_balance,
        sign,
        result.return_pct()
    ));
    out.push_str(&format!("Total Trades:     {}\n", stats.total_trades));
    out.push_str(&format!(
        "Win Rate:         {:.1}% ({} won / {} lost)\n",
        stats.win_rate, stats.winning_trades, stats.losing_trades
    ));
    out.push_str(&format!("Profit Factor:    {:.2}\n", stats.profit_factor));
    out.push_str(&format!("Max Drawdown:     {:.1}%\n", stats.max_drawdown));
    out.push_str(&format!(
        "Avg Win / Loss:   ${:.2} / ${:.2}\n",
        stats.avg_win, stats.avg_loss
    ));
    out
}

fn print_backtest_summary(result: &BacktestResult) {
    print!("{}", format_backtest_summary(result));
}

pub fn run_dry_run(
    config_path: &Path,
    cli_seed: Option<u64>,
    overrides: &BacktestOverrides,
) -> ExitCode {
    info!("loading config from {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(e) => return fail(e),
    };

    let (config, prices, seed) = match prepare_backtest(&adapter, cli_seed, overrides) {
        Ok(prepared) => prepared,
        Err(e) => return fail(e),
    };

    print!("{}", format_dry_run(&config, &prices, seed));
    ExitCode::SUCCESS
}

pub fn format_dry_run(config: &BacktestConfig, prices: &PriceTable, seed: Option<u64>) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "Strategy:        {} ({})\n",
        config.strategy.display_name(),
        config.strategy
    ));
    out.push_str(&format!("Pair:            {}\n", config.currency_pair));
    out.push_str(&format!(
        "Period:          {} to {}\n",
        config.start_date, config.end_date
    ));
    out.push_str(&format!("Initial Balance: ${:.2}\n", config.initial_balance));
    out.push_str(&format!(
        "Risk / Reward:   {}% risked, {:.2}x reward\n",
        config.risk_per_trade,
        config.reward_ratio()
    ));
    out.push_str(&format!(
        "Base Price:      {}\n",
        prices.base_price(&config.currency_pair)
    ));
    match seed {
        Some(seed) => out.push_str(&format!("Seed:            {seed}\n")),
        None => out.push_str("Seed:            (random)\n"),
    }
    out.push_str("\nDry run complete: configuration is valid\n");
    out
}

pub fn run_validate(config_path: &Path) -> ExitCode {
    info!("validating {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(e) => return fail(e),
    };

    let has_backtest = adapter.get_string("backtest", "start_date").is_some()
        || adapter.get_string("backtest", "end_date").is_some();
    if has_backtest {
        if let Err(e) = validate_backtest_config(&adapter) {
            return fail(e);
        }
        println!("[backtest] ok");
    } else {
        warn!("no [backtest] dates configured, skipping backtest checks");
    }

    if let Err(e) = validate_portfolio_config(&adapter) {
        return fail(e);
    }
    println!("[portfolio] ok");
    println!("\nConfiguration is valid.");
    ExitCode::SUCCESS
}

fn load_or_create(
    store: &dyn PortfolioStore,
    config: &dyn ConfigPort,
    initial_balance: Option<f64>,
) -> Result<Portfolio, FxlabError> {
    match store.load()? {
        Some(portfolio) => Ok(portfolio),
        None => {
            let balance = initial_balance.unwrap_or_else(|| {
                config.get_double("portfolio", "initial_balance", DEFAULT_INITIAL_BALANCE)
            });
            info!(balance, "creating new paper portfolio");
            Portfolio::new(balance)
        }
    }
}

/// Apply one paper action against the stored portfolio and persist the result.
/// The load, change and save run under the store's exclusive access. Nothing
/// is saved when the action fails.
pub fn apply_paper_action(
    store: &dyn PortfolioStore,
    config: &dyn ConfigPort,
    action: &PaperAction,
) -> Result<PaperOutcome, FxlabError> {
    validate_portfolio_config(config)?;
    let prices = build_price_table(config);

    let mut outcome = None;
    store.with_exclusive(&mut || -> Result<(), FxlabError> {
        outcome = Some(apply_to_stored(store, config, &prices, action)?);
        Ok(())
    })?;
    outcome.ok_or_else(|| FxlabError::Store {
        reason: "store did not run the paper action".to_string(),
    })
}

fn apply_to_stored(
    store: &dyn PortfolioStore,
    config: &dyn ConfigPort,
    prices: &PriceTable,
    action: &PaperAction,
) -> Result<PaperOutcome, FxlabError> {
    let initial_balance = match action {
        PaperAction::Open {
            initial_balance, ..
        } => *initial_balance,
        _ => None,
    };
    let mut portfolio = load_or_create(store, config, initial_balance)?;

    let outcome = match action {
        PaperAction::Open {
            pair,
            side,
            quantity,
            price,
            take_profit,
            stop_loss,
            ..
        } => {
            let pair = parse_pair(pair)?;
            let trade_type: TradeType = side.parse()?;
            let entry_price = match price {
                Some(p) => *p,
                None => prices.mark_price(&pair).ok_or_else(|| {
                    FxlabError::invalid_config("entry_price", format!("no mark price for {pair}"))
                })?,
            };
            let mut request = OpenTrade::new(&pair, trade_type, *quantity, entry_price);
            request.take_profit = *take_profit;
            request.stop_loss = *stop_loss;
            PaperOutcome::Opened(portfolio.open_trade(request)?)
        }
        PaperAction::Close { id, price } => match price {
            Some(p) => PaperOutcome::Closed(portfolio.close_trade(*id, *p)?),
            None => PaperOutcome::Closed(portfolio.close_at_market(*id, prices)?),
        },
        PaperAction::Reset => PaperOutcome::Reset {
            cancelled: portfolio.reset(),
        },
        PaperAction::Status => PaperOutcome::Status(portfolio.clone()),
    };

    if !matches!(outcome, PaperOutcome::Status(_)) {
        store.save(&portfolio)?;
    }
    Ok(outcome)
}

pub fn run_paper(state_path: &Path, config_path: Option<&Path>, action: &PaperAction) -> ExitCode {
    let config = match config_path {
        Some(path) => match load_config(path) {
            Ok(c) => c,
            Err(e) => return fail(e),
        },
        None => FileConfigAdapter::empty(),
    };
    let store = JsonStoreAdapter::new(state_path);

    let outcome = match apply_paper_action(&store, &config, action) {
        Ok(o) => o,
        Err(e) => return fail(e),
    };

    match outcome {
        PaperOutcome::Opened(trade) => {
            println!(
                "Opened #{}: {} {} {} lots @ {} (notional ${:.2})",
                trade.id,
                trade.trade_type,
                trade.currency_pair,
                trade.quantity,
                trade.entry_price,
                estimated_value(trade.quantity, trade.entry_price)
            );
        }
        PaperOutcome::Closed(trade) => {
            let pnl = trade.profit_loss.unwrap_or(0.0);
            let sign = if pnl >= 0.0 { "+" } else { "" };
            println!(
                "Closed #{} @ {}: {}{:.2}",
                trade.id,
                trade.exit_price.unwrap_or(trade.entry_price),
                sign,
                pnl
            );
        }
        PaperOutcome::Reset { cancelled } => {
            println!("Portfolio reset, {cancelled} open trade(s) cancelled");
        }
        PaperOutcome::Status(portfolio) => {
            print!("{}", format_portfolio_status(&portfolio, &build_price_table(&config)));
        }
    }
    ExitCode::SUCCESS
}

pub fn format_portfolio_status(portfolio: &Portfolio, prices: &PriceTable) -> String {
    let summary = portfolio.summary();
    let sign = if summary.total_profit >= 0.0 { "+" } else { "" };
    let mut out = String::new();
    out.push_str(&format!("Balance:        ${:.2}\n", summary.balance));
    out.push_str(&format!(
        "Total P&L:      {}${:.2} ({:.2}%)\n",
        sign, summary.total_profit, summary.pnl_pct
    ));
    out.push_str(&format!("Open Trades:    {}\n", summary.open_trades));
    out.push_str(&format!(
        "Win Rate:       {:.1}% ({}/{})\n",
        summary.win_rate, summary.winning_trades, summary.closed_trades
    ));

    let open: Vec<&PaperTrade> = portfolio.open_trades().collect();
    if !open.is_empty() {
        let floating = portfolio.total_unrealized_pnl(prices);
        let sign = if floating >= 0.0 { "+" } else { "" };
        out.push_str(&format!("Unrealized P&L: {}${:.2}\n", sign, floating));
        out.push_str("\n=== Open Positions ===\n");
        for trade in open {
            let mark = prices
                .mark_price(&trade.currency_pair)
                .unwrap_or(trade.entry_price);
            let pnl = trade.unrealized_pnl(mark);
            let sign = if pnl >= 0.0 { "+" } else { "" };
            out.push_str(&format!(
                "  #{} {} {} {} lots @ {} -> {}: {}{:.2}\n",
                trade.id,
                trade.trade_type,
                trade.currency_pair,
                trade.quantity,
                trade.entry_price,
                mark,
                sign,
                pnl
            ));
        }
    }
    out
}
