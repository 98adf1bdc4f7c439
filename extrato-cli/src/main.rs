use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use extrato_core::{ExtratoError, StatementTables, WorkTable};
use extrato_finance::oauth::{self, AccessToken, ClientCredentials};
use extrato_finance::summary::{self, SummaryMeta};
use extrato_finance::workbook::{write_csv_workbook, write_statement_workbook};
use extrato_finance::{CsvTable, ListStore, load_csv};
use extrato_ingest::{PageOcr, StatementParser, statement_pages};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod config;
mod ocr;
mod state;

use config::{Config, ListTarget, Secrets};

#[derive(Parser, Debug)]
#[command(
    name = "extrato",
    version = concat!(env!("CARGO_PKG_VERSION"), " (", env!("EXTRATO_BUILD_SHA"), ")"),
    about = "Extract statement/CSV transactions, export to Excel, upload to a remote list"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Parse a statement PDF into debit and PIX tables
    Statement(StatementArgs),

    /// Normalize a CSV `valor` column and keep only negative rows
    Csv(CsvArgs),

    /// Remote list-store helpers
    List {
        #[command(subcommand)]
        command: ListCommand,
    },

    /// Manage ~/.extrato/config.toml
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

#[derive(clap::Args, Debug)]
struct StatementArgs {
    /// Statement PDF
    pdf: PathBuf,

    /// OCR pages without a text layer (needs pdftoppm + tesseract)
    #[arg(long)]
    ocr: bool,

    /// OCR language (default from config, "por")
    #[arg(long)]
    lang: Option<String>,

    /// Delete a debit row by its displayed index (repeatable)
    #[arg(long = "drop-tx")]
    drop_tx: Vec<usize>,

    /// Delete a PIX row by its displayed index (repeatable)
    #[arg(long = "drop-pix")]
    drop_pix: Vec<usize>,

    /// Write the tables to this .xlsx
    #[arg(long)]
    xlsx: Option<PathBuf>,

    /// Append a TOTAL row to each sheet
    #[arg(long)]
    total: bool,

    /// Format each sheet as an Excel table
    #[arg(long)]
    styled: bool,

    #[command(flatten)]
    push: PushArgs,
}

#[derive(clap::Args, Debug)]
struct PushArgs {
    /// Push summary records (debit / PIX totals) to the remote list
    #[arg(long)]
    push: bool,

    /// Title of the pushed records (default: PDF file name)
    #[arg(long)]
    title: Option<String>,

    /// Due date, DD/MM/YYYY
    #[arg(long)]
    due: Option<String>,

    /// Who paid
    #[arg(long = "paid-by")]
    paid_by: Option<String>,

    /// Mark the records as paid
    #[arg(long)]
    paid: bool,

    #[command(flatten)]
    target: TargetArgs,
}

#[derive(clap::Args, Debug)]
struct TargetArgs {
    /// Override list.site_id
    #[arg(long = "site-id")]
    site_id: Option<String>,

    /// Override list.list_id
    #[arg(long = "list-id")]
    list_id: Option<String>,

    /// Sign in interactively (device code) instead of using AZURE_CLIENT_SECRET
    #[arg(long = "device-code")]
    device_code: bool,
}

#[derive(clap::Args, Debug)]
struct CsvArgs {
    /// CSV file with a `valor` column (any case)
    csv: PathBuf,

    /// Delete a filtered row by its displayed index (repeatable)
    #[arg(long)]
    drop: Vec<usize>,

    /// Write the filtered rows to this .xlsx
    #[arg(long)]
    xlsx: Option<PathBuf>,

    /// Append a TOTAL row
    #[arg(long)]
    total: bool,

    /// Format the sheet as an Excel table
    #[arg(long)]
    styled: bool,

    /// Upload every remaining row to the remote list
    #[arg(long)]
    upload: bool,

    #[command(flatten)]
    target: TargetArgs,
}

#[derive(Subcommand, Debug)]
enum ListCommand {
    /// Insert one fixed test item using client credentials
    TestInsert {
        #[command(flatten)]
        target: TargetArgs,
    },

    /// Acquire a token and report whether it worked
    Token {
        /// Sign in interactively (device code)
        #[arg(long = "device-code")]
        device_code: bool,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Write a default config if none exists
    Init,
    /// Print the effective config
    Show,
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Statement(args) => {
            let cfg = config::load_config()?;
            statement(args, &cfg).await?;
        }

        Command::Csv(args) => {
            let cfg = config::load_config()?;
            csv(args, &cfg).await?;
        }

        Command::List { command } => {
            let cfg = config::load_config()?;
            match command {
                ListCommand::TestInsert { target } => {
                    let session = ListSession::open(&cfg, &target).await?;
                    session.store.create_item(&summary::test_item()).await?;
                    println!("Item inserido com sucesso na lista");
                }
                ListCommand::Token { device_code } => {
                    let secrets = Secrets::from_env()?;
                    let token = acquire_token(&cfg, &secrets, device_code).await?;
                    match token.expires_in {
                        Some(s) => println!("Token obtido com sucesso (expira em {s}s)"),
                        None => println!("Token obtido com sucesso"),
                    }
                }
            }
        }

        Command::Config { command } => match command {
            ConfigCommand::Init => config::init_config()?,
            ConfigCommand::Show => {
                let cfg = config::load_config()?;
                println!("# {}", config::config_path()?.display());
                print!("{}", toml::to_string_pretty(&cfg).context("serialize config")?);
            }
        },
    }

    Ok(())
}

async fn statement(args: StatementArgs, cfg: &Config) -> Result<()> {
    if !args.pdf.exists() {
        bail!("PDF not found: {}", args.pdf.display());
    }

    // Configuration problems halt before any parsing.
    let mut meta = None;
    if args.push.push {
        args.push.target.resolve(cfg)?;
        let secrets = Secrets::from_env()?;
        if !args.push.target.device_code {
            secrets.require_secret()?;
        }
        meta = Some(SummaryMeta {
            title: args.push.title.clone().unwrap_or_else(|| file_label(&args.pdf)),
            due: args.push.due.as_deref().map(summary::parse_due_date).transpose()?,
            paid_by: args.push.paid_by.clone(),
            paid: args.push.paid,
        });
    }

    let ocr = if args.ocr {
        let lang = args.lang.as_deref().unwrap_or(&cfg.ocr.language);
        Some(ocr::TesseractOcr::locate(lang, cfg.ocr.dpi)?)
    } else {
        None
    };

    let pages = statement_pages(&args.pdf, ocr.as_ref().map(|o| o as &dyn PageOcr))
        .with_context(|| format!("reading {}", args.pdf.display()))?;
    info!(pages = pages.len(), "extracted statement text");

    let tables = StatementParser::new()?.parse_pages(&pages);
    if tables.is_empty() {
        let e = ExtratoError::NoTables(args.pdf.display().to_string());
        warn!("{e}");
        println!("Nenhuma tabela reconhecida no PDF.");
        return Ok(());
    }

    let mut debits = WorkTable::new(tables.transactions);
    let mut pix = WorkTable::new(tables.beneficiaries);
    let dropped = debits.delete_many(&args.drop_tx) + pix.delete_many(&args.drop_pix);
    if dropped > 0 {
        info!(dropped, "removed rows");
    }
    let tables = StatementTables {
        transactions: debits.into_rows(),
        beneficiaries: pix.into_rows(),
    };

    print_statement(&tables);

    if let Some(out) = &args.xlsx {
        let opts = cfg.export.options(args.total, args.styled);
        write_statement_workbook(out, &tables, opts)?;
        println!("\nWrote {}", out.display());
    }

    if let Some(meta) = meta {
        let records = summary::statement_summary(&tables, &meta);
        let session = ListSession::open(cfg, &args.push.target).await?;
        for rec in &records {
            session
                .store
                .create_item(rec)
                .await
                .with_context(|| format!("pushing {}", rec.expense))?;
        }
        println!("\nEnviados {} registros para a lista", records.len());
    }

    Ok(())
}

async fn csv(args: CsvArgs, cfg: &Config) -> Result<()> {
    if !args.csv.exists() {
        bail!("CSV not found: {} (pass a path to an existing file)", args.csv.display());
    }
    if args.upload {
        args.target.resolve(cfg)?;
        let secrets = Secrets::from_env()?;
        if !args.target.device_code {
            secrets.require_secret()?;
        }
    }

    let table = load_csv(&args.csv)?;
    let report = table.summary();
    println!("{report}");

    let bad = table.unparsable_sample(10);
    if !bad.is_empty() {
        warn!(count = report.unparsable, "some rows could not be converted (NaN)");
        println!("\nLinhas não convertidas (amostra):");
        for row in bad {
            println!("  {}", join_cells(row.cells.iter().map(|c| c.as_deref())));
        }
    }

    let filtered = table.retain_negative();
    let mut work = WorkTable::new(filtered.rows);
    let dropped = work.delete_many(&args.drop);
    if dropped > 0 {
        info!(dropped, "removed rows");
    }
    let table = CsvTable {
        headers: filtered.headers,
        valor_column: filtered.valor_column,
        rows: work.into_rows(),
    };

    print_csv(&table);

    if let Some(out) = &args.xlsx {
        let opts = cfg.export.options(args.total, args.styled);
        write_csv_workbook(out, &table, opts)?;
        println!("\nWrote {}", out.display());
    }

    if args.upload {
        let session = ListSession::open(cfg, &args.target).await?;
        let n = session.store.upload_csv_rows(&table).await?;
        println!("\nTodos os {n} registros foram enviados para a lista");
    }

    Ok(())
}

/// An authenticated list client for the duration of one action.
struct ListSession {
    store: ListStore,
}

impl ListSession {
    async fn open(cfg: &Config, target: &TargetArgs) -> Result<Self> {
        let ListTarget { site_id, list_id } = target.resolve(cfg)?;
        let secrets = Secrets::from_env()?;
        let token = acquire_token(cfg, &secrets, target.device_code).await?;
        let store = ListStore::new(
            reqwest::Client::new(),
            cfg.list.graph_base.clone(),
            site_id,
            list_id,
            &token,
        );
        Ok(Self { store })
    }
}

impl TargetArgs {
    fn resolve(&self, cfg: &Config) -> Result<ListTarget> {
        cfg.list.target(self.site_id.clone(), self.list_id.clone())
    }
}

async fn acquire_token(cfg: &Config, secrets: &Secrets, device_code: bool) -> Result<AccessToken> {
    let authority = oauth::authority_url(&cfg.list.authority_host, &secrets.tenant_id);
    let http = reqwest::Client::new();

    if device_code {
        return oauth::device_code_token(&http, &authority, &secrets.client_id, &cfg.list.scope, |code| {
            match &code.message {
                Some(m) => println!("{m}"),
                None => println!(
                    "Open {} and enter the code {}",
                    code.verification_uri, code.user_code
                ),
            }
        })
        .await;
    }

    let creds = ClientCredentials {
        client_id: secrets.client_id.clone(),
        client_secret: secrets.require_secret()?.to_string(),
    };
    oauth::client_credentials_token(&http, &authority, &creds, &cfg.list.scope).await
}

fn file_label(path: &std::path::Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "extrato".to_string())
}

fn print_statement(tables: &StatementTables) {
    if !tables.transactions.is_empty() {
        println!("## Débitos\n");
        for (i, t) in tables.transactions.iter().enumerate() {
            println!("[{i:>3}] {} | {} | {:.2}", t.date, t.description, t.amount);
        }
        println!("\nTotal: {:.2} ({} linhas)", tables.total_transactions(), tables.transactions.len());
    }
    if !tables.beneficiaries.is_empty() {
        if !tables.transactions.is_empty() {
            println!();
        }
        println!("## PIX / Beneficiários\n");
        for (i, b) in tables.beneficiaries.iter().enumerate() {
            println!("[{i:>3}] {} | {} | {:.2}", b.date, b.beneficiary, b.amount);
        }
        println!("\nTotal: {:.2} ({} linhas)", tables.total_beneficiaries(), tables.beneficiaries.len());
    }
}

fn print_csv(table: &CsvTable) {
    println!("\n## Dados (apenas valores negativos)\n");
    println!("      {}", table.headers.join(" | "));
    for (i, row) in table.rows.iter().enumerate() {
        println!("[{i:>3}] {}", join_cells(row.cells.iter().map(|c| c.as_deref())));
    }
    println!("\nTotal {}: {:.2} ({} linhas)", table.valor_header(), table.total_valor(), table.rows.len());
}

fn join_cells<'a>(cells: impl Iterator<Item = Option<&'a str>>) -> String {
    cells.map(|c| c.unwrap_or("")).collect::<Vec<_>>().join(" | ")
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
    fn test_parse_statement_args() {
        let cli = Cli::try_parse_from([
            "extrato", "statement", "fatura.pdf", "--ocr", "--drop-tx", "2", "--drop-tx", "0",
            "--xlsx", "out.xlsx", "--total", "--push", "--due", "10/10/2025", "--paid-by", "Ana",
        ])
        .unwrap();
        let Command::Statement(args) = cli.command else {
            panic!("expected statement command");
        };
        assert!(args.ocr);
        assert_eq!(args.drop_tx, vec![2, 0]);
        assert!(args.total && !args.styled);
        assert!(args.push.push);
        assert_eq!(args.push.paid_by.as_deref(), Some("Ana"));
        assert!(!args.push.target.device_code);
    }

    #[test]
    fn test_parse_csv_upload_args() {
        let cli = Cli::try_parse_from([
            "extrato", "csv", "dados.csv", "--drop", "1", "--upload", "--site-id", "s", "--list-id", "l",
        ])
        .unwrap();
        let Command::Csv(args) = cli.command else {
            panic!("expected csv command");
        };
        assert!(args.upload);
        assert_eq!(args.target.site_id.as_deref(), Some("s"));

        let cfg = Config::default();
        let target = args.target.resolve(&cfg).unwrap();
        assert_eq!(target.list_id, "l");
    }

    #[test]
    fn test_file_label_and_cells() {
        assert_eq!(file_label(std::path::Path::new("/tmp/fatura-09.pdf")), "fatura-09");
        assert_eq!(join_cells([Some("a"), None, Some("c")].into_iter()), "a |  | c");
    }
}
