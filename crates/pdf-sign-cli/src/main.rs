mod logger;

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use pdf_signpages::{DocumentProfile, SignatureRule};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "pdfsig", about = "Stamp captured signatures onto PDF pages", version)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign every applicable page and write the reassembled PDF
    Sign {
        #[command(flatten)]
        job: JobArgs,

        /// Output PDF file
        #[arg(short, long)]
        output: PathBuf,

        /// Also write the result as a base64 data URI to this file
        #[arg(long)]
        data_uri: Option<PathBuf>,
    },

    /// Write the unsigned and signed variant of each page into a directory
    Pages {
        #[command(flatten)]
        job: JobArgs,

        /// Directory for the per-page PDFs
        #[arg(short, long)]
        out_dir: PathBuf,
    },
}

#[derive(Args)]
struct JobArgs {
    /// Input PDF file
    #[arg(short, long)]
    input: PathBuf,

    /// Signature image (PNG/JPEG, or a text file holding a data URI)
    #[arg(short, long)]
    signature: PathBuf,

    /// JSON document profile with the placement rules
    #[arg(long, conflicts_with = "rule")]
    profile: Option<PathBuf>,

    /// Inline placement rule: x,y,width,height[,pages] (pages defaults to all)
    #[arg(long, num_args = 1..)]
    rule: Vec<SignatureRule>,
}

impl JobArgs {
    async fn profile(&self) -> Result<DocumentProfile> {
        if let Some(path) = &self.profile {
            return DocumentProfile::load(path)
                .await
                .with_context(|| format!("Failed to load profile {}", path.display()));
        }
        if self.rule.is_empty() {
            bail!("Either --profile or at least one --rule is required");
        }
        let key = self
            .input
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| "document".to_string());
        Ok(DocumentProfile::new(key, self.rule.clone()))
    }

    async fn signature(&self) -> Result<Vec<u8>> {
        let bytes = tokio::fs::read(&self.signature)
            .await
            .with_context(|| format!("Failed to read signature {}", self.signature.display()))?;
        if bytes.starts_with(b"data:") {
            let text = String::from_utf8(bytes).context("Signature data URI is not UTF-8")?;
            return Ok(pdf_signpages::decode_data_uri(text.trim())?);
        }
        Ok(bytes)
    }

    async fn generate(&self) -> Result<pdf_signpages::PageSet> {
        let profile = self.profile().await?;
        let signature = self.signature().await?;
        let source = pdf_signpages::load_pdf(&self.input)
            .await
            .with_context(|| format!("Failed to load {}", self.input.display()))?;
        Ok(pdf_signpages::generate_page_set(&profile, source, &signature).await?)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logger::StderrLogger::new(cli.verbose).init()?;

    match cli.command {
        Commands::Sign {
            job,
            output,
            data_uri,
        } => {
            let page_set = job.generate().await?;
            println!(
                "Rendered {} pages, {} need a signature",
                page_set.len(),
                page_set.required_count()
            );

            let final_doc = pdf_signpages::aggregate(page_set.pages())?;
            pdf_signpages::save_pdf(&final_doc, &output).await?;
            println!("Signed → {}", output.display());

            if let Some(path) = data_uri {
                let encoded = pdf_signpages::encode_result(&final_doc)?;
                tokio::fs::write(&path, encoded.data_uri).await?;
                println!("Data URI → {}", path.display());
            }
        }

        Commands::Pages { job, out_dir } => {
            let page_set = job.generate().await?;
            tokio::fs::create_dir_all(&out_dir).await?;

            for page in page_set.pages() {
                let number = page.page_index + 1;
                write_artifact(&out_dir, number, "unsigned", page.unsigned.bytes()).await?;
                write_artifact(&out_dir, number, "signed", page.signed.bytes()).await?;
            }
            println!(
                "Wrote {} page variants → {}",
                page_set.len() * 2,
                out_dir.display()
            );
        }
    }

    Ok(())
}

async fn write_artifact(dir: &Path, number: usize, variant: &str, bytes: &[u8]) -> Result<()> {
    let path = dir.join(format!("page-{:03}-{}.pdf", number, variant));
    tokio::fs::write(&path, bytes)
        .await
        .with_context(|| format!("Failed to write {}", path.display()))
}
