//! Shared-custody CLI Application
//!
//! A command-line interface for the local ledger and the multisig program.

use clap::{Parser, Subcommand};
use shared_custody::api::{create_router, ApiState};
use shared_custody::cli::{self, AppState};
use shared_custody::multisig::Processor;
use shared_custody::storage::{Storage, StorageConfig};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "custody")]
#[command(author = "Darshan")]
#[command(version = "0.1.0")]
#[command(about = "Shared-custody multisig engine", long_about = None)]
struct Cli {
    /// Data directory for the ledger and keystore
    #[arg(short, long, default_value = ".custody_data")]
    data_dir: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize an empty ledger
    Init,

    /// Identity key operations
    Key {
        #[command(subcommand)]
        action: KeyCommands,
    },

    /// Credit native lamports to an identity or address
    Faucet {
        /// Label or address to credit
        #[arg(short, long)]
        to: String,

        #[arg(short, long)]
        amount: u64,
    },

    /// Show native and token balances
    Balance {
        /// Label or address
        #[arg(short, long)]
        address: String,
    },

    /// Token operations
    Token {
        #[command(subcommand)]
        action: TokenCommands,
    },

    /// User registry operations
    User {
        #[command(subcommand)]
        action: UserCommands,
    },

    /// Multisig group operations
    Multisig {
        #[command(subcommand)]
        action: MultisigCommands,
    },

    /// Deposit funds into a multisig's custody
    Deposit {
        /// Paying identity (label or address)
        #[arg(short, long)]
        from: String,

        #[arg(short, long)]
        multisig: String,

        /// `native` or a token mint address
        #[arg(long, default_value = "native")]
        asset: String,

        #[arg(short, long)]
        amount: u64,
    },

    /// Propose a transfer out of custody
    Propose {
        /// Proposing owner (label or address)
        #[arg(short, long)]
        from: String,

        #[arg(short, long)]
        multisig: String,

        /// Receiver (label or address)
        #[arg(short, long)]
        to: String,

        /// `native` or a token mint address
        #[arg(long, default_value = "native")]
        asset: String,

        #[arg(short, long)]
        amount: u64,

        /// Seconds until the proposal expires
        #[arg(short, long, default_value = "86400")]
        expires_in: i64,
    },

    /// Approve a proposal
    Approve {
        /// Approving owner (label or address)
        #[arg(short, long)]
        from: String,

        /// Proposal address
        #[arg(short, long)]
        transaction: String,
    },

    /// Execute an approved proposal
    Execute {
        /// Executing owner (label or address)
        #[arg(short, long)]
        from: String,

        /// Proposal address
        #[arg(short, long)]
        transaction: String,
    },

    /// Cancel a proposal (proposer only)
    Cancel {
        /// Proposer (label or address)
        #[arg(short, long)]
        from: String,

        /// Proposal address
        #[arg(short, long)]
        transaction: String,
    },

    /// Show recent program events
    Events {
        #[arg(short, long, default_value = "20")]
        count: usize,
    },

    /// Export the ledger to a file
    Export {
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Import the ledger from a file
    Import {
        #[arg(short, long)]
        input: PathBuf,
    },

    /// REST API server
    Api {
        #[command(subcommand)]
        action: ApiCommands,
    },
}

#[derive(Subcommand)]
enum KeyCommands {
    /// Create a new identity
    New {
        #[arg(short, long)]
        label: Option<String>,
    },

    /// List all identities
    List,
}

#[derive(Subcommand)]
enum TokenCommands {
    /// Create a token; the full supply goes to the authority
    Create {
        /// Authority identity (label or address)
        #[arg(short, long)]
        authority: String,

        #[arg(short, long)]
        name: String,

        #[arg(short, long)]
        symbol: String,

        #[arg(short, long, default_value = "6")]
        decimals: u8,

        #[arg(long)]
        supply: u64,
    },

    /// Transfer tokens between holders
    Transfer {
        /// Sending identity (label or address)
        #[arg(short, long)]
        from: String,

        #[arg(short, long)]
        mint: String,

        /// Recipient (label or address)
        #[arg(short, long)]
        to: String,

        #[arg(short, long)]
        amount: u64,
    },
}

#[derive(Subcommand)]
enum UserCommands {
    /// Create the user record for an identity
    Init {
        /// Creator identity (label or address)
        #[arg(short, long)]
        creator: String,
    },
}

#[derive(Subcommand)]
enum MultisigCommands {
    /// Create a multisig group
    Create {
        /// Creator identity (label or address); must be an owner
        #[arg(short, long)]
        creator: String,

        /// Owners (labels or addresses, comma-separated)
        #[arg(short, long, value_delimiter = ',')]
        owners: Vec<String>,

        /// Approvals required to execute
        #[arg(short, long)]
        threshold: u8,
    },

    /// Show a multisig group
    Show {
        #[arg(short, long)]
        address: String,
    },

    /// List a group's proposals
    Proposals {
        #[arg(short, long)]
        address: String,
    },
}

#[derive(Subcommand)]
enum ApiCommands {
    /// Start the REST API server
    Start {
        /// Port to listen on
        #[arg(short, long, default_value = "3000")]
        port: u16,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    if let Commands::Init = &cli.command {
        return cli::cmd_init(&cli.data_dir);
    }

    if let Commands::Api { ref action } = cli.command {
        return run_api_command(action, &cli.data_dir);
    }

    let mut state = AppState::new(cli.data_dir.clone())?;

    match cli.command {
        Commands::Init | Commands::Api { .. } => unreachable!(),
        Commands::Key { action } => match action {
            KeyCommands::New { label } => cli::cmd_key_new(&mut state, label.as_deref())?,
            KeyCommands::List => cli::cmd_key_list(&state)?,
        },
        Commands::Faucet { to, amount } => cli::cmd_faucet(&mut state, &to, amount)?,
        Commands::Balance { address } => cli::cmd_balance(&state, &address)?,
        Commands::Token { action } => match action {
            TokenCommands::Create {
                authority,
                name,
                symbol,
                decimals,
                supply,
            } => cli::cmd_token_create(&mut state, &authority, &name, &symbol, decimals, supply)?,
            TokenCommands::Transfer {
                from,
                mint,
                to,
                amount,
            } => cli::cmd_token_transfer(&mut state, &from, &mint, &to, amount)?,
        },
        Commands::User { action } => match action {
            UserCommands::Init { creator } => cli::cmd_user_init(&mut state, &creator)?,
        },
        Commands::Multisig { action } => match action {
            MultisigCommands::Create {
                creator,
                owners,
                threshold,
            } => cli::cmd_multisig_create(&mut state, &creator, &owners, threshold)?,
            MultisigCommands::Show { address } => cli::cmd_multisig_show(&state, &address)?,
            MultisigCommands::Proposals { address } => {
                cli::cmd_multisig_proposals(&state, &address)?
            }
        },
        Commands::Deposit {
            from,
            multisig,
            asset,
            amount,
        } => cli::cmd_deposit(&mut state, &from, &multisig, &asset, amount)?,
        Commands::Propose {
            from,
            multisig,
            to,
            asset,
            amount,
            expires_in,
        } => cli::cmd_propose(&mut state, &from, &multisig, &to, &asset, amount, expires_in)?,
        Commands::Approve { from, transaction } => {
            cli::cmd_approve(&mut state, &from, &transaction)?
        }
        Commands::Execute { from, transaction } => {
            cli::cmd_execute(&mut state, &from, &transaction)?
        }
        Commands::Cancel { from, transaction } => {
            cli::cmd_cancel(&mut state, &from, &transaction)?
        }
        Commands::Events { count } => cli::cmd_events(&state, count)?,
        Commands::Export { output } => cli::cmd_export(&state, &output)?,
        Commands::Import { input } => cli::cmd_import(&mut state, &input)?,
    }

    Ok(())
}

fn run_api_command(action: &ApiCommands, data_dir: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let rt = tokio::runtime::Runtime::new()?;

    rt.block_on(async {
        match action {
            ApiCommands::Start { port } => {
                let storage = Storage::new(StorageConfig::in_dir(data_dir))?;

                let ledger = if storage.exists() {
                    println!("📂 Loading existing ledger...");
                    storage.load()?
                } else {
                    println!("🆕 Starting with an empty ledger...");
                    let ledger = shared_custody::core::Ledger::new();
                    storage.save(&ledger)?;
                    ledger
                };

                let state = ApiState::new(ledger, storage, Processor::default());
                let shutdown_state = state.clone();
                let app = create_router(state);

                let addr = format!("0.0.0.0:{}", port);
                println!("🚀 REST API server starting on http://localhost:{}", port);
                println!();
                println!("📖 Available endpoints:");
                println!("   GET  /health                                - Health check");
                println!("   GET  /api/accounts/{{address}}               - Account balance and record");
                println!("   GET  /api/users/{{creator}}                  - User record");
                println!("   GET  /api/multisig/{{address}}               - Multisig group");
                println!("   GET  /api/multisig/{{address}}/transactions  - Group proposals");
                println!("   GET  /api/transactions/{{address}}           - Proposal");
                println!("   GET  /api/events                            - Recent events");
                println!("   POST /api/instructions                      - Submit signed instruction");
                println!();

                tokio::spawn(async move {
                    tokio::signal::ctrl_c().await.ok();
                    println!("\n📴 Shutting down API server...");

                    let ledger = shutdown_state.ledger.read().await;
                    match shutdown_state.storage.save(&ledger) {
                        Ok(()) => println!("✅ Ledger saved"),
                        Err(e) => log::error!("Failed to save ledger on shutdown: {}", e),
                    }
                    std::process::exit(0);
                });

                let listener = tokio::net::TcpListener::bind(&addr).await?;
                axum::serve(listener, app).await?;
            }
        }

        Ok::<(), Box<dyn std::error::Error>>(())
    })?;

    Ok(())
}
