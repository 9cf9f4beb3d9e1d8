use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use dotenv::dotenv;
use tokio::signal;
use tokio::sync::mpsc;
use tracing::{error, info};

use wallet_health::config::Settings;
use wallet_health::error::handle_unexpected_error;
use wallet_health::hub::{format_sol, AppView, WalletHealthHub};
use wallet_health::jupiter_client::{mint_symbol, resolve_mint};
use wallet_health::monitoring::{init_logging, LogNotifier};
use wallet_health::orchestrator::SweepDestination;
use wallet_health::simulation::REFUEL_OPTIONS;
use wallet_health::types::{lamports_to_sol, BatchItemEvent, Chain, DcaFrequency, NetworkMode};
use wallet_health::wallet::KeypairWallet;

#[derive(Parser, Debug)]
#[command(name = "wallet-health", version, about = "Solana wallet health toolkit: dust, spam, gas and orders")]
struct Cli {
    /// Network mode: devnet (simulated) or mainnet-beta
    #[arg(long, global = true)]
    network: Option<NetworkMode>,

    /// Chain to scan for dust
    #[arg(long, global = true, default_value = "solana")]
    chain: Chain,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List low-value tokens
    ScanDust,
    /// Swap dust into SOL or USDC, one token at a time
    Sweep {
        #[arg(long, default_value = "sol")]
        to: SweepDestination,
        /// Only sweep these mints (default: all dust)
        #[arg(long = "mint")]
        mints: Vec<String>,
    },
    /// List empty, unverified token accounts
    ScanSpam,
    /// Close spam token accounts and reclaim rent
    Burn {
        /// Only close these token accounts (default: all spam)
        #[arg(long = "account")]
        accounts: Vec<String>,
    },
    /// Show the SOL balance and whether a refuel is needed
    Balance,
    /// Swap a fixed amount of USDC or JUP into SOL
    Refuel {
        /// Refuel option, 1 to 3
        #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u8).range(1..=3))]
        option: u8,
    },
    /// Manage limit orders
    Limit {
        #[command(subcommand)]
        action: LimitAction,
    },
    /// Manage recurring (DCA) orders
    Dca {
        #[command(subcommand)]
        action: DcaAction,
    },
    /// Keep the order list fresh until Ctrl+C
    WatchOrders,
    /// Advanced trading tools
    Pro,
}

#[derive(Subcommand, Debug)]
enum LimitAction {
    List,
    Create {
        /// Token to sell (symbol or mint)
        #[arg(long)]
        sell: String,
        /// Token to buy (symbol or mint)
        #[arg(long)]
        buy: String,
        /// Amount of the sell token
        #[arg(long)]
        amount: f64,
        /// Amount of the buy token to receive
        #[arg(long)]
        receive: f64,
    },
    Cancel {
        order_id: String,
    },
}

#[derive(Subcommand, Debug)]
enum DcaAction {
    List,
    Create {
        /// Token to spend (symbol or mint)
        #[arg(long)]
        from: String,
        /// Token to buy (symbol or mint)
        #[arg(long)]
        to: String,
        /// Amount spent per order
        #[arg(long)]
        amount: f64,
        #[arg(long, default_value_t = 4)]
        orders: u32,
        #[arg(long, default_value = "weekly")]
        frequency: DcaFrequency,
    },
    Cancel {
        order_id: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    let cli = Cli::parse();

    let mut settings = Settings::from_env().context("Failed to load configuration")?;
    if let Some(mode) = cli.network {
        settings.network_mode = mode;
    }

    let _guard = init_logging(&settings.log_dir, "debug", &settings.console_log_level())?;
    info!(mode = %settings.network_mode, chain = ?cli.chain, "Starting wallet health hub");

    let wallet = settings
        .wallet_private_key
        .as_deref()
        .map(KeypairWallet::from_base58)
        .transpose()?;

    let mut hub = WalletHealthHub::new(settings, Arc::new(LogNotifier))?;
    hub.set_chain(cli.chain);
    if let Some(wallet) = wallet {
        hub.connect_wallet(Arc::new(wallet)).await;
    }

    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<BatchItemEvent>();
    hub.set_event_sender(Some(event_tx));
    let progress = tokio::spawn(async move {
        while let Some(event) = event_rx.recv().await {
            info!(batch = %event.batch_id, "{}", event.status_line());
        }
    });

    let outcome = run(&mut hub, cli.command).await;

    hub.shutdown().await;
    hub.set_event_sender(None);
    if let Err(e) = progress.await {
        let err = handle_unexpected_error(e, "Progress printer task failed");
        error!(error = %err, "Shutdown incomplete");
    }

    outcome
}

async fn run(hub: &mut WalletHealthHub, command: Commands) -> Result<()> {
    match command {
        Commands::ScanDust => {
            hub.set_active_view(AppView::DustSweeper).await;
            let dust = hub.scan_dust().await?;
            if dust.is_empty() {
                println!("No dust found. Your wallet is clean!");
            }
            for token in dust {
                println!(
                    "{:<8} {:>16} ${:<8.4} {}",
                    token.symbol,
                    token.display_amount(),
                    token.usd_value,
                    token.mint
                );
            }
        }
        Commands::Sweep { to, mints } => {
            hub.set_active_view(AppView::DustSweeper).await;
            hub.scan_dust().await?;
            let selection = (!mints.is_empty()).then_some(mints.as_slice());
            let report = hub.sweep_dust(to, selection).await?;
            println!("Swept {} tokens", report.summary());
            if let Some(failed) = report.failure {
                return Err(anyhow!("sweep stopped at {}: {}", failed.label, failed.error));
            }
        }
        Commands::ScanSpam => {
            hub.set_active_view(AppView::SpamShield).await;
            let spam = hub.scan_spam().await?;
            if spam.is_empty() {
                println!("No spam token accounts found.");
            }
            for token in spam {
                println!("{:<16} account {} mint {}", token.name, token.token_account, token.mint);
            }
        }
        Commands::Burn { accounts } => {
            hub.set_active_view(AppView::SpamShield).await;
            hub.scan_spam().await?;
            let selection = (!accounts.is_empty()).then_some(accounts.as_slice());
            let outcome = hub.burn_spam(selection).await?;
            println!(
                "Closed {} accounts, recovered ~{:.5} SOL",
                outcome.burned.len(),
                lamports_to_sol(outcome.recovered_lamports)
            );
            if let Some(failed) = outcome.report.failure {
                return Err(anyhow!("burn stopped at {}: {}", failed.label, failed.error));
            }
        }
        Commands::Balance => {
            hub.set_active_view(AppView::SolRefuel).await;
            let balance = hub.refresh_sol_balance().await?;
            println!("SOL balance: {}", format_sol(balance));
            println!("Refuel available: {}", hub.needs_refuel());
            for (i, option) in REFUEL_OPTIONS.iter().enumerate() {
                println!("  [{}] {}", i + 1, option.label());
            }
        }
        Commands::Refuel { option } => {
            hub.set_active_view(AppView::SolRefuel).await;
            hub.refresh_sol_balance().await?;
            let report = hub.refuel(usize::from(option - 1)).await?;
            if let Some(failed) = report.failure {
                return Err(anyhow!("refuel failed: {}", failed.error));
            }
            println!("SOL balance: {}", format_sol(hub.sol_balance_lamports()));
        }
        Commands::Limit { action } => {
            hub.set_active_view(AppView::LimitOrder).await;
            match action {
                LimitAction::List => {
                    for order in hub.refresh_limit_orders().await? {
                        println!(
                            "{} sell {} {} for {} {} [{}]",
                            order.id,
                            order.making_amount,
                            symbol_of(&order.input_mint),
                            order.taking_amount,
                            symbol_of(&order.output_mint),
                            order.status
                        );
                    }
                }
                LimitAction::Create {
                    sell,
                    buy,
                    amount,
                    receive,
                } => {
                    let receipt = hub
                        .create_limit_order(&resolve_mint(&sell), &resolve_mint(&buy), amount, receive)
                        .await?;
                    println!("Order {}", receipt.order_id.as_deref().unwrap_or("submitted"));
                }
                LimitAction::Cancel { order_id } => {
                    hub.cancel_limit_order(&order_id).await?;
                    println!("Cancelled {}", order_id);
                }
            }
        }
        Commands::Dca { action } => {
            hub.set_active_view(AppView::DcaWizard).await;
            match action {
                DcaAction::List => {
                    for order in hub.refresh_dca().await? {
                        println!(
                            "{} {} {} -> {} x{} {} [{}] next run {}",
                            order.id,
                            order.in_amount_per_cycle,
                            symbol_of(&order.input_mint),
                            symbol_of(&order.output_mint),
                            order.number_of_orders,
                            order.frequency,
                            order.status,
                            hub.next_dca_run(&order).format("%Y-%m-%d %H:%M UTC")
                        );
                    }
                }
                DcaAction::Create {
                    from,
                    to,
                    amount,
                    orders,
                    frequency,
                } => {
                    let receipt = hub
                        .schedule_dca(&resolve_mint(&from), &resolve_mint(&to), amount, orders, frequency, None)
                        .await?;
                    println!("Schedule {}", receipt.order_id.as_deref().unwrap_or("submitted"));
                }
                DcaAction::Cancel { order_id } => {
                    hub.cancel_dca(&order_id).await?;
                    println!("Cancelled {}", order_id);
                }
            }
        }
        Commands::WatchOrders => {
            hub.set_active_view(AppView::LimitOrder).await;
            if !hub.is_polling() {
                hub.start_order_polling()?;
            }
            info!("Watching orders. Press Ctrl+C to exit.");
            signal::ctrl_c().await.context("Failed to install Ctrl+C handler")?;
            info!("Ctrl+C received, stopping order polling");
            let book = hub.order_book().await;
            println!(
                "{} limit orders, {} DCA schedules",
                book.limit_orders.len(),
                book.dca_orders.len()
            );
        }
        Commands::Pro => {
            hub.set_active_view(AppView::ProTrader).await;
            hub.pro_trader_notify();
        }
    }
    Ok(())
}

fn symbol_of(mint: &str) -> &str {
    mint_symbol(mint).unwrap_or(mint)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_refuel_option_is_bounded() {
        for bad in ["0", "4"] {
            assert!(Cli::try_parse_from(["wallet-health", "refuel", "--option", bad]).is_err());
        }

        let cli = Cli::try_parse_from(["wallet-health", "refuel", "--option", "3"]).unwrap();
        assert!(matches!(cli.command, Commands::Refuel { option: 3 }));

        let cli = Cli::try_parse_from(["wallet-health", "--network", "devnet", "refuel"]).unwrap();
        assert!(matches!(cli.command, Commands::Refuel { option: 1 }));
        assert_eq!(cli.network, Some(NetworkMode::Devnet));
    }
}
