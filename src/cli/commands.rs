//! CLI command handlers
//!
//! Every mutating command signs an instruction with a keystore identity,
//! runs it through the processor with the wall clock, and saves the ledger.

use crate::core::{Address, Clock, Ledger};
use crate::multisig::{Asset, Instruction, ProcessOutcome, Processor, TransactionStatus};
use crate::storage::{Storage, StorageConfig};
use crate::wallet::{Identity, Keystore};
use std::path::{Path, PathBuf};

/// Result type for CLI operations
pub type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

/// Application state
pub struct AppState {
    pub ledger: Ledger,
    pub storage: Storage,
    pub keystore: Keystore,
    pub processor: Processor,
    pub data_dir: PathBuf,
}

impl AppState {
    pub fn new(data_dir: PathBuf) -> CliResult<Self> {
        let config = StorageConfig::in_dir(&data_dir);
        let keystore = Keystore::new(&config.keys_dir())?;
        let storage = Storage::new(config)?;

        let ledger = storage.load_or_default()?;
        log::debug!(
            "Ledger loaded from {:?} ({} accounts)",
            data_dir,
            ledger.account_count()
        );

        Ok(Self {
            ledger,
            storage,
            keystore,
            processor: Processor::default(),
            data_dir,
        })
    }

    pub fn save(&self) -> CliResult<()> {
        self.storage.save(&self.ledger)?;
        Ok(())
    }

    /// Sign, apply and persist one instruction
    fn submit(&mut self, signer: &Identity, instruction: Instruction) -> CliResult<ProcessOutcome> {
        let signed = signer.sign(instruction, rand::random())?;
        let outcome = self
            .processor
            .process(&mut self.ledger, &signed, &Clock::now())?;
        self.save()?;
        Ok(outcome)
    }

    fn keystore_dir(&self) -> PathBuf {
        self.storage.config().keys_dir()
    }

    fn address(&self, label_or_address: &str) -> CliResult<Address> {
        Ok(self.keystore.resolve_address(label_or_address)?)
    }

    fn identity(&self, label_or_address: &str) -> CliResult<Identity> {
        Ok(self.keystore.resolve(label_or_address)?)
    }
}

fn parse_address(s: &str) -> CliResult<Address> {
    Ok(s.parse::<Address>()?)
}

/// Create the data directory, keystore and an empty ledger
pub fn cmd_init(data_dir: &Path) -> CliResult<()> {
    let config = StorageConfig::in_dir(data_dir);
    Keystore::new(&config.keys_dir())?;
    let storage = Storage::new(config)?;

    if storage.exists() {
        println!("⚠️  Ledger already exists at {:?}", data_dir);
        return Ok(());
    }

    storage.save(&Ledger::new())?;

    println!("✅ Ledger initialized!");
    println!("   📁 Data directory: {:?}", data_dir);
    Ok(())
}

pub fn cmd_key_new(state: &mut AppState, label: Option<&str>) -> CliResult<()> {
    let identity = state.keystore.create(label)?;

    println!("🔐 New identity created!");
    println!("   📍 Address: {}", identity.address());
    println!("   🔑 Public Key: {}", identity.public_key());
    if let Some(l) = &identity.label {
        println!("   🏷️  Label: {}", l);
    }
    println!("\n   ⚠️  The private key is stored in {:?}", state.keystore_dir());
    Ok(())
}

pub fn cmd_key_list(state: &AppState) -> CliResult<()> {
    let identities = state.keystore.list()?;

    if identities.is_empty() {
        println!("📭 No identities found. Create one with: custody key new");
        return Ok(());
    }

    println!("📋 Identities:");
    for identity in &identities {
        let address = identity.address();
        println!(
            "   {} ({}) - {} lamports",
            address,
            identity.label.as_deref().unwrap_or("-"),
            state.ledger.lamports(&address)
        );
    }
    Ok(())
}

/// Mint native balance (local ledger only)
pub fn cmd_faucet(state: &mut AppState, to: &str, amount: u64) -> CliResult<()> {
    let address = state.address(to)?;
    let balance = state.ledger.credit(&address, amount)?;
    state.save()?;

    println!("🚰 Credited {} lamports to {}", amount, address);
    println!("   New balance: {}", balance);
    Ok(())
}

pub fn cmd_balance(state: &AppState, who: &str) -> CliResult<()> {
    let address = state.address(who)?;
    let tokens = state.ledger.tokens().tokens_for_holder(&address);

    println!("💰 Balance for {}", address);
    println!("   Native: {} lamports", state.ledger.lamports(&address));
    for (token, balance) in tokens {
        println!("   └─ {} {} ({})", balance, token.symbol(), token.address);
    }
    Ok(())
}

pub fn cmd_token_create(
    state: &mut AppState,
    authority: &str,
    name: &str,
    symbol: &str,
    decimals: u8,
    supply: u64,
) -> CliResult<()> {
    let signer = state.identity(authority)?;
    let outcome = state.submit(
        &signer,
        Instruction::CreateToken {
            name: name.to_string(),
            symbol: symbol.to_string(),
            decimals,
            total_supply: supply,
        },
    )?;

    if let ProcessOutcome::TokenCreated { mint } = outcome {
        println!("🪙 Token created: {} ({})", name, symbol);
        println!("   Mint: {}", mint);
        println!("   Supply: {} held by {}", supply, signer.display_name());
    }
    Ok(())
}

pub fn cmd_token_transfer(
    state: &mut AppState,
    from: &str,
    mint: &str,
    to: &str,
    amount: u64,
) -> CliResult<()> {
    let signer = state.identity(from)?;
    let mint = parse_address(mint)?;
    let to = state.address(to)?;

    state.submit(&signer, Instruction::TransferToken { mint, to, amount })?;

    println!("📤 Transferred {} of {} to {}", amount, mint.short(), to);
    Ok(())
}

pub fn cmd_user_init(state: &mut AppState, creator: &str) -> CliResult<()> {
    let signer = state.identity(creator)?;
    let outcome = state.submit(&signer, Instruction::InitializeUser)?;

    if let ProcessOutcome::UserInitialized { user } = outcome {
        println!("👤 User record created for {}", signer.display_name());
        println!("   Address: {}", user);
    }
    Ok(())
}

pub fn cmd_multisig_create(
    state: &mut AppState,
    creator: &str,
    owners: &[String],
    threshold: u8,
) -> CliResult<()> {
    let signer = state.identity(creator)?;
    let owners = owners
        .iter()
        .map(|o| state.address(o))
        .collect::<CliResult<Vec<Address>>>()?;
    let owner_count = owners.len();

    let outcome = state.submit(&signer, Instruction::InitializeMultisig { owners, threshold })?;

    if let ProcessOutcome::MultisigInitialized { multisig } = outcome {
        println!("🔐 Multisig created ({}-of-{})", threshold, owner_count);
        println!("   Address: {}", multisig);
        println!("   Fund it with: custody deposit --multisig {}", multisig);
    }
    Ok(())
}

pub fn cmd_multisig_show(state: &AppState, address: &str) -> CliResult<()> {
    let address = parse_address(address)?;
    let multisig = state.ledger.multisig(&address)?;

    println!("🔐 Multisig {}", address);
    println!("   ├─ Creator: {}", multisig.creator);
    println!("   ├─ Id: {}", multisig.id);
    println!("   ├─ Threshold: {}", multisig.description());
    println!("   ├─ Proposals: {}", multisig.tx_count);
    println!("   ├─ Native custody: {}", state.ledger.lamports(&address));
    for (token, balance) in state.ledger.tokens().tokens_for_holder(&address) {
        println!("   ├─ {} custody: {}", token.symbol(), balance);
    }
    println!("   └─ Owners:");
    for owner in &multisig.owners {
        println!("      {}", owner);
    }
    Ok(())
}

pub fn cmd_multisig_proposals(state: &AppState, address: &str) -> CliResult<()> {
    let address = parse_address(address)?;
    state.ledger.multisig(&address)?;
    let now = Clock::now().unix_timestamp;
    let proposals = state.ledger.transactions_for(&address);

    if proposals.is_empty() {
        println!("📭 No proposals for {}", address.short());
        return Ok(());
    }

    println!("📋 Proposals for {}:", address.short());
    for (tx_address, tx) in proposals {
        let status = tx.status(now);
        let marker = match status {
            TransactionStatus::Executed => "✅",
            TransactionStatus::Approved => "🟢",
            TransactionStatus::Pending => "⏳",
            TransactionStatus::Expired => "⌛",
            TransactionStatus::Canceled => "🚫",
        };
        println!(
            "   {} #{} {} | {} ({}) -> {} | {}/{} approvals | {}",
            marker,
            tx.tx_count,
            tx_address,
            tx.amount,
            tx.asset,
            tx.receiver.short(),
            tx.approval_count(),
            tx.threshold,
            status
        );
    }
    Ok(())
}

pub fn cmd_deposit(
    state: &mut AppState,
    payer: &str,
    multisig: &str,
    asset: &str,
    amount: u64,
) -> CliResult<()> {
    let signer = state.identity(payer)?;
    let multisig = parse_address(multisig)?;
    let asset: Asset = asset.parse()?;

    let outcome = state.submit(
        &signer,
        Instruction::Deposit {
            multisig,
            asset,
            amount,
        },
    )?;

    if let ProcessOutcome::Deposited { custody } = outcome {
        println!("📥 Deposited {} ({}) into {}", amount, asset, multisig.short());
        println!("   Custody balance: {}", custody);
    }
    Ok(())
}

pub fn cmd_propose(
    state: &mut AppState,
    creator: &str,
    multisig: &str,
    receiver: &str,
    asset: &str,
    amount: u64,
    expires_in: i64,
) -> CliResult<()> {
    let signer = state.identity(creator)?;
    let multisig = parse_address(multisig)?;
    let receiver = state.address(receiver)?;
    let asset: Asset = asset.parse()?;
    let expire_at = Clock::now().unix_timestamp + expires_in;

    let outcome = state.submit(
        &signer,
        Instruction::CreateTransaction {
            multisig,
            receiver,
            asset,
            amount,
            expire_at,
        },
    )?;

    if let ProcessOutcome::TransactionCreated { transaction } = outcome {
        println!("📝 Proposal created: {}", transaction);
        println!("   {} ({}) to {}", amount, asset, receiver);
        if let Some(at) = Clock::new(expire_at).to_datetime() {
            println!("   Expires: {}", at.format("%Y-%m-%d %H:%M:%S UTC"));
        }
    }
    Ok(())
}

pub fn cmd_approve(state: &mut AppState, owner: &str, transaction: &str) -> CliResult<()> {
    let signer = state.identity(owner)?;
    let transaction = parse_address(transaction)?;

    let outcome = state.submit(&signer, Instruction::ApproveTransaction { transaction })?;

    if let ProcessOutcome::TransactionApproved { approvals } = outcome {
        let threshold = state.ledger.transaction(&transaction)?.threshold;
        println!("✍️  Approved by {}", signer.display_name());
        println!("   Approvals: {}/{}", approvals, threshold);
        if approvals >= threshold as usize {
            println!("   🟢 Threshold reached; any owner may execute");
        }
    }
    Ok(())
}

/// Execute a proposal; receiver, group and asset are taken from the proposal
pub fn cmd_execute(state: &mut AppState, owner: &str, transaction: &str) -> CliResult<()> {
    let signer = state.identity(owner)?;
    let transaction = parse_address(transaction)?;
    let proposal = state.ledger.transaction(&transaction)?.clone();

    state.submit(
        &signer,
        Instruction::ExecuteTransaction {
            transaction,
            multisig: proposal.multisig,
            receiver: proposal.receiver,
            asset: proposal.asset,
        },
    )?;

    println!("🚀 Proposal executed!");
    println!(
        "   {} ({}) sent to {}",
        proposal.amount, proposal.asset, proposal.receiver
    );
    Ok(())
}

pub fn cmd_cancel(state: &mut AppState, creator: &str, transaction: &str) -> CliResult<()> {
    let signer = state.identity(creator)?;
    let transaction = parse_address(transaction)?;

    state.submit(&signer, Instruction::CancelTransaction { transaction })?;

    println!("🚫 Proposal {} canceled", transaction);
    Ok(())
}

pub fn cmd_events(state: &AppState, count: usize) -> CliResult<()> {
    let events = state.ledger.events();
    let start = events.len().saturating_sub(count);

    println!("📜 Recent events:");
    for event in &events[start..] {
        let when = Clock::new(event.time())
            .to_datetime()
            .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| event.time().to_string());
        println!("   {} | {} | {}", when, event.label(), serde_json::to_string(event)?);
    }
    Ok(())
}

pub fn cmd_export(state: &AppState, path: &Path) -> CliResult<()> {
    crate::storage::save_to_file(&state.ledger, path)?;
    println!("📦 Ledger exported to {:?}", path);
    Ok(())
}

pub fn cmd_import(state: &mut AppState, path: &Path) -> CliResult<()> {
    state.ledger = crate::storage::load_from_file(path)?;
    state.save()?;

    println!("📥 Ledger imported from {:?}", path);
    println!("   Accounts: {}", state.ledger.account_count());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state_in(dir: &Path) -> AppState {
        cmd_init(dir).unwrap();
        AppState::new(dir.to_path_buf()).unwrap()
    }

    #[test]
    fn test_lifecycle_through_commands() {
        let temp_dir = tempfile::tempdir().unwrap();
        let mut state = state_in(temp_dir.path());

        cmd_key_new(&mut state, Some("alice")).unwrap();
        cmd_key_new(&mut state, Some("bob")).unwrap();
        cmd_key_new(&mut state, Some("carol")).unwrap();
        cmd_faucet(&mut state, "alice", 1_000).unwrap();
        cmd_user_init(&mut state, "alice").unwrap();
        cmd_multisig_create(
            &mut state,
            "alice",
            &["alice".to_string(), "bob".to_string()],
            2,
        )
        .unwrap();

        let alice = state.address("alice").unwrap();
        let carol = state.address("carol").unwrap();
        let (multisig, _) = state.ledger.multisigs_by_creator(&alice)[0];
        cmd_deposit(&mut state, "alice", &multisig.to_string(), "native", 600).unwrap();
        cmd_propose(&mut state, "bob", &multisig.to_string(), "carol", "native", 250, 3_600)
            .unwrap();

        let (tx, _) = state.ledger.transactions_for(&multisig)[0];
        assert!(cmd_execute(&mut state, "alice", &tx.to_string()).is_err());

        cmd_approve(&mut state, "alice", &tx.to_string()).unwrap();
        cmd_approve(&mut state, "bob", &tx.to_string()).unwrap();
        cmd_execute(&mut state, "alice", &tx.to_string()).unwrap();

        assert_eq!(state.ledger.lamports(&carol), 250);
        assert_eq!(state.ledger.lamports(&multisig), 350);
        assert_eq!(state.ledger.multisig(&multisig).unwrap().description(), "2-of-2");
        cmd_multisig_show(&state, &multisig.to_string()).unwrap();
        cmd_multisig_proposals(&state, &multisig.to_string()).unwrap();

        let reloaded = AppState::new(temp_dir.path().to_path_buf()).unwrap();
        assert!(reloaded.ledger.transaction(&tx).unwrap().is_executed);
    }

    #[test]
    fn test_unknown_identity_is_an_error() {
        let temp_dir = tempfile::tempdir().unwrap();
        let mut state = state_in(temp_dir.path());

        assert!(cmd_user_init(&mut state, "nobody").is_err());
        assert_eq!(state.ledger.account_count(), 0);
    }

    #[test]
    fn test_export_import_roundtrip() {
        let temp_dir = tempfile::tempdir().unwrap();
        let mut state = state_in(temp_dir.path());
        cmd_key_new(&mut state, Some("dave")).unwrap();
        cmd_faucet(&mut state, "dave", 42).unwrap();

        let path = temp_dir.path().join("export.json");
        cmd_export(&state, &path).unwrap();

        state.ledger = Ledger::new();
        cmd_import(&mut state, &path).unwrap();
        let dave = state.address("dave").unwrap();
        assert_eq!(state.ledger.lamports(&dave), 42);
    }
}
