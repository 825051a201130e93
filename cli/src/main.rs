//! jtools CLI - journal production utilities

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{Parser, Subcommand};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;

use journal_tools::docx::diagnose;
use journal_tools::docx::{extract_images, DocxPackage, ExtractOptions};
use journal_tools::emails::{audit_file, export_report, render_report, AuditOptions};
use journal_tools::export::{export_titles, ColumnOrder};
use journal_tools::gif::{self, DEFAULT_WIDTH};
use journal_tools::pdf::volume::{DEFAULT_NEW_VOLUME, DEFAULT_OLD_VOLUME};
use journal_tools::pdf::{
    self, add_footer, FooterOptions, FooterOutcome, FooterPlacement, VolumeChange, VolumeOptions,
};
use journal_tools::scrape::{
    ArticleOutcome, IssueScraper, ScrapeOptions, Site, TitleCollector, DEFAULT_BASE_URL,
    DEFAULT_LABEL, DEFAULT_SLUG,
};
use journal_tools::collect_titles;

type CmdResult = Result<(), Box<dyn std::error::Error>>;

#[derive(Parser)]
#[command(name = "jtools")]
#[command(author = "iyulab")]
#[command(version)]
#[command(about = "Journal production tools: PDF footers, volume fixes, figures, scraping, audits", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Add corresponding-author footers to every matching PDF in a folder
    Footer {
        /// Folder of article PDFs
        #[arg(value_name = "PDF_DIR")]
        folder: PathBuf,

        /// Spreadsheet with titles and author lines
        #[arg(value_name = "SPREADSHEET")]
        spreadsheet: PathBuf,

        /// Title column header
        #[arg(long, default_value = "title")]
        title_column: String,

        /// Author column header
        #[arg(long, default_value = "Corresponding_Author")]
        author_column: String,

        /// Sheet name (first sheet if not specified)
        #[arg(short, long)]
        sheet: Option<String>,

        /// Stamp every page, centered
        #[arg(long)]
        all_pages: bool,
    },

    /// Put a footer on a single PDF
    Stamp {
        /// Input PDF file
        #[arg(value_name = "PDF")]
        input: PathBuf,

        /// Footer text
        #[arg(value_name = "TEXT")]
        text: String,

        /// Output file (overwrites the input if not specified)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Stamp every page, centered
        #[arg(long)]
        all_pages: bool,
    },

    /// Rewrite the volume number printed in PDFs
    Volume {
        /// Folder of PDFs
        #[arg(value_name = "DIR", default_value = ".")]
        folder: PathBuf,

        /// Volume number to replace
        #[arg(long, default_value_t = DEFAULT_OLD_VOLUME)]
        from: u32,

        /// Replacement volume number
        #[arg(long, default_value_t = DEFAULT_NEW_VOLUME)]
        to: u32,

        /// Write results here instead of overwriting
        #[arg(short, long, value_name = "DIR")]
        output: Option<PathBuf>,

        /// Keep a `_backup.pdf` copy of each overwritten file
        #[arg(long)]
        backup: bool,
    },

    /// Extract captioned figures and schemes from a DOCX as GIFs
    Extract {
        /// Input DOCX file
        #[arg(value_name = "DOCX")]
        input: PathBuf,

        /// Output directory (a folder per document is created inside)
        #[arg(short, long, value_name = "DIR")]
        output: Option<PathBuf>,

        /// GIF width in pixels
        #[arg(long, default_value_t = DEFAULT_WIDTH)]
        width: u32,
    },

    /// Convert a single raster image to GIF
    Convert {
        /// Input image
        #[arg(value_name = "INPUT")]
        input: PathBuf,

        /// Output GIF
        #[arg(value_name = "OUTPUT")]
        output: PathBuf,

        /// GIF width in pixels
        #[arg(long, default_value_t = DEFAULT_WIDTH)]
        width: u32,
    },

    /// Diagnose image relationships inside a DOCX
    Inspect {
        #[command(subcommand)]
        report: InspectCommand,
    },

    /// Download every article PDF of one issue
    Scrape {
        /// Volume number
        #[arg(short, long)]
        volume: u32,

        /// Issue number
        #[arg(short, long)]
        issue: u32,

        /// Output directory
        #[arg(short, long, value_name = "DIR", default_value = "downloads")]
        output: PathBuf,

        #[command(flatten)]
        site: SiteArgs,

        /// Enable debug logging
        #[arg(long)]
        verbose: bool,
    },

    /// Collect article titles from the journal website
    Titles {
        /// First volume
        #[arg(long, default_value_t = 1)]
        from: u32,

        /// Last volume
        #[arg(long, default_value_t = 18)]
        to: u32,

        /// Output workbook
        #[arg(short, long, value_name = "FILE", default_value = "all_titles_from_web.xlsx")]
        output: PathBuf,

        /// Only report how many issues each volume has
        #[arg(long)]
        count_only: bool,

        #[command(flatten)]
        site: SiteArgs,
    },

    /// Collect titles of PDFs already downloaded
    Collect {
        /// Folders to search
        #[arg(value_name = "ROOT", required = true)]
        roots: Vec<PathBuf>,

        /// Output workbook
        #[arg(short, long, value_name = "FILE", default_value = "journal_titles_collection.xlsx")]
        output: PathBuf,
    },

    /// Report rows with missing email addresses
    Emails {
        /// Spreadsheet to audit
        #[arg(value_name = "XLSX")]
        input: PathBuf,

        /// Email column (detected if not specified)
        #[arg(short, long)]
        email_column: Option<String>,

        /// Sheet name (first sheet if not specified)
        #[arg(short, long)]
        sheet: Option<String>,

        /// Filter by volume number
        #[arg(short, long)]
        volume: Option<i64>,

        /// Filter by issue number
        #[arg(short, long)]
        issue: Option<i64>,

        /// Export results to an Excel file
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Hide individual record details
        #[arg(long)]
        no_details: bool,

        /// Maximum rows to display
        #[arg(long, default_value_t = journal_tools::emails::DEFAULT_MAX_ROWS)]
        max_rows: usize,
    },
}

#[derive(Subcommand)]
enum InspectCommand {
    /// Relationship, paragraph, table and header/footer image counts
    Summary(InspectArgs),
    /// Which image relationships are referenced and where
    Refs(InspectArgs),
    /// Locate specific relationship ids
    Locate {
        #[command(flatten)]
        args: InspectArgs,

        /// Relationship ids (e.g. rId7)
        #[arg(value_name = "RID", required = true)]
        rel_ids: Vec<String>,
    },
    /// VML pictures and alternate-content blocks
    Containers(InspectArgs),
    /// Embedded OLE objects
    Ole(InspectArgs),
    /// Images with identical content
    Duplicates(InspectArgs),
}

#[derive(clap::Args)]
struct InspectArgs {
    /// Input DOCX file
    #[arg(value_name = "DOCX")]
    input: PathBuf,

    /// Print JSON instead of text
    #[arg(long)]
    json: bool,
}

#[derive(clap::Args)]
struct SiteArgs {
    /// Journal site
    #[arg(long, env = "JTOOLS_BASE_URL", default_value = DEFAULT_BASE_URL)]
    base_url: String,

    /// Journal path segment
    #[arg(long, env = "JTOOLS_SLUG", default_value = DEFAULT_SLUG)]
    slug: String,

    /// Folder label
    #[arg(long, env = "JTOOLS_LABEL", default_value = DEFAULT_LABEL)]
    label: String,
}

impl SiteArgs {
    fn site(&self) -> Site {
        Site::new(&self.base_url, &self.slug).with_label(&self.label)
    }
}

fn main() {
    let cli = Cli::parse();

    let verbose = matches!(cli.command, Commands::Scrape { verbose: true, .. });
    init_logging(verbose);

    let result = match cli.command {
        Commands::Footer {
            folder,
            spreadsheet,
            title_column,
            author_column,
            sheet,
            all_pages,
        } => {
            let mut options = FooterOptions::new()
                .with_title_column(title_column)
                .with_author_column(author_column)
                .with_placement(placement(all_pages));
            if let Some(sheet) = sheet {
                options = options.with_sheet(sheet);
            }
            cmd_footer(&folder, &spreadsheet, &options)
        }
        Commands::Stamp {
            input,
            text,
            output,
            all_pages,
        } => cmd_stamp(&input, &text, output.as_deref(), all_pages),
        Commands::Volume {
            folder,
            from,
            to,
            output,
            backup,
        } => cmd_volume(&folder, from, to, output, backup),
        Commands::Extract {
            input,
            output,
            width,
        } => cmd_extract(&input, output, width),
        Commands::Convert {
            input,
            output,
            width,
        } => cmd_convert(&input, &output, width),
        Commands::Inspect { report } => cmd_inspect(report),
        Commands::Scrape {
            volume,
            issue,
            output,
            site,
            ..
        } => cmd_scrape(volume, issue, output, site.site()),
        Commands::Titles {
            from,
            to,
            output,
            count_only,
            site,
        } => {
            if count_only {
                cmd_issue_counts(from, to, site.site())
            } else {
                cmd_titles(from, to, &output, site.site())
            }
        }
        Commands::Collect { roots, output } => cmd_collect(&roots, &output),
        Commands::Emails {
            input,
            email_column,
            sheet,
            volume,
            issue,
            output,
            no_details,
            max_rows,
        } => {
            let options = AuditOptions {
                email_column,
                sheet,
                volume,
                issue,
            };
            cmd_emails(&input, &options, output.as_deref(), !no_details, max_rows)
        }
    };

    if let Err(e) = result {
        eprintln!("{}: {}", "Error".red().bold(), e);
        std::process::exit(1);
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default))
        .format_timestamp(None)
        .init();
}

fn placement(all_pages: bool) -> FooterPlacement {
    if all_pages {
        FooterPlacement::AllPagesCentered
    } else {
        FooterPlacement::FirstPage
    }
}

fn progress_bar(len: u64) -> ProgressBar {
    let pb = ProgressBar::new(len);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-"),
    );
    pb
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}

fn print_json<T: Serialize>(value: &T) -> CmdResult {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn cmd_footer(folder: &Path, spreadsheet: &Path, options: &FooterOptions) -> CmdResult {
    let count = pdf::pdf_files_in(folder)?.len();
    if count == 0 {
        println!("{}", "No PDF files found".yellow());
        return Ok(());
    }

    let pb = progress_bar(count as u64);
    let summary = pdf::footer::process_folder(folder, spreadsheet, options, |path, outcome| {
        let name = file_name(path);
        match outcome {
            FooterOutcome::Stamped { author } => {
                pb.println(format!("{} {} ({})", "Stamped".green(), name, author.dimmed()))
            }
            FooterOutcome::NoMatch => pb.println(format!("{} {}", "No match".yellow(), name)),
            FooterOutcome::Failed(e) => pb.println(format!("{} {}: {}", "Failed".red(), name, e)),
        }
        pb.set_message(name);
        pb.inc(1);
    })?;
    pb.finish_and_clear();

    println!("\n{}", "Summary".cyan().bold());
    println!("{}", "─".repeat(40).dimmed());
    println!("{}: {}", "Total PDFs".bold(), summary.total);
    println!("{}: {}", "Processed".bold(), summary.processed.to_string().green());
    println!("{}: {}", "Skipped".bold(), summary.skipped.to_string().yellow());
    Ok(())
}

fn cmd_stamp(input: &Path, text: &str, output: Option<&Path>, all_pages: bool) -> CmdResult {
    add_footer(input, text, placement(all_pages), output)?;
    let written = output.unwrap_or(input);
    println!("{} {}", "Stamped".green().bold(), written.display());
    Ok(())
}

fn cmd_volume(folder: &Path, from: u32, to: u32, output: Option<PathBuf>, backup: bool) -> CmdResult {
    let change = VolumeChange::new(from, to)?;
    let mut options = VolumeOptions::new().with_backup(backup);
    if let Some(dir) = output {
        options = options.with_output_dir(dir);
    }

    let count = pdf::pdf_files_in(folder)?.len();
    if count == 0 {
        println!("{}", "No PDF files found".yellow());
        return Ok(());
    }
    println!("Changing volume {} to {} in {} file(s)", from, to, count);

    let pb = progress_bar(count as u64);
    let summary = pdf::volume::process_folder(folder, &change, &options, |path, result| {
        let name = file_name(path);
        match result {
            Ok(0) => pb.println(format!("{} {}", "Unchanged".yellow(), name)),
            Ok(n) => pb.println(format!("{} {} ({} replacement(s))", "Updated".green(), name, n)),
            Err(e) => pb.println(format!("{} {}: {}", "Failed".red(), name, e)),
        }
        pb.inc(1);
    })?;
    pb.finish_and_clear();

    println!(
        "\n{} {}/{} files updated",
        "Done!".green().bold(),
        summary.successful,
        summary.total
    );
    Ok(())
}

fn cmd_extract(input: &Path, output: Option<PathBuf>, width: u32) -> CmdResult {
    let mut options = ExtractOptions::new().with_width(width);
    if let Some(dir) = output {
        options = options.with_output_dir(dir);
    }

    let summary = extract_images(input, &options)?;
    if summary.found == 0 {
        println!("{}", "No images found".yellow());
        return Ok(());
    }

    println!("{}", "Extracted images".cyan().bold());
    println!("{}", "─".repeat(40).dimmed());
    for (i, file) in summary.files.iter().enumerate() {
        let branch = if i + 1 == summary.files.len() { "└─" } else { "├─" };
        println!(
            "  {} {} ({}x{})",
            branch.dimmed(),
            file.file_name,
            file.width,
            file.height
        );
    }

    println!();
    println!("{}: {}", "Found".bold(), summary.found);
    println!("{}: {}", "Figures".bold(), summary.figures);
    println!("{}: {}", "Schemes".bold(), summary.schemes);
    if summary.failed > 0 {
        println!("{}: {}", "Failed".bold(), summary.failed.to_string().red());
    }
    println!("{}: {}", "Output".bold(), summary.output_dir.display());
    Ok(())
}

fn cmd_convert(input: &Path, output: &Path, width: u32) -> CmdResult {
    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let (w, h) = gif::convert_file(input, output, width)?;
    println!("{} {} ({}x{})", "Created".green().bold(), output.display(), w, h);
    Ok(())
}

fn cmd_inspect(report: InspectCommand) -> CmdResult {
    match report {
        InspectCommand::Summary(args) => {
            let pkg = DocxPackage::open(&args.input)?;
            let summary = diagnose::summary(&pkg)?;
            if args.json {
                print_json(&summary)
            } else {
                print!("{}", summary);
                Ok(())
            }
        }
        InspectCommand::Refs(args) => {
            let pkg = DocxPackage::open(&args.input)?;
            let refs = diagnose::references(&pkg);
            if args.json {
                print_json(&refs)
            } else {
                print!("{}", refs);
                Ok(())
            }
        }
        InspectCommand::Locate { args, rel_ids } => {
            let pkg = DocxPackage::open(&args.input)?;
            let locations = diagnose::locate(&pkg, &rel_ids)?;
            if args.json {
                print_json(&locations)
            } else {
                print!("{}", diagnose::render_locations(&locations));
                Ok(())
            }
        }
        InspectCommand::Containers(args) => {
            let pkg = DocxPackage::open(&args.input)?;
            let report = diagnose::containers(&pkg);
            if args.json {
                print_json(&report)
            } else {
                print!("{}", report);
                Ok(())
            }
        }
        InspectCommand::Ole(args) => {
            let pkg = DocxPackage::open(&args.input)?;
            let objects = diagnose::ole_objects(&pkg);
            if args.json {
                print_json(&objects)
            } else {
                print!("{}", diagnose::render_ole_objects(&objects));
                Ok(())
            }
        }
        InspectCommand::Duplicates(args) => {
            let pkg = DocxPackage::open(&args.input)?;
            let report = diagnose::duplicates(&pkg);
            if args.json {
                print_json(&report)
            } else {
                print!("{}", report);
                Ok(())
            }
        }
    }
}

fn runtime() -> std::io::Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
}

fn cmd_scrape(volume: u32, issue: u32, output: PathBuf, site: Site) -> CmdResult {
    let options = ScrapeOptions::new()
        .with_site(site)
        .with_output_dir(output)
        .with_delay(Duration::from_secs(1));
    let scraper = IssueScraper::new(options)?;

    println!(
        "{} Volume {}, Issue {}",
        "Scraping".cyan().bold(),
        volume,
        issue
    );

    let mut pb: Option<ProgressBar> = None;
    let summary = runtime()?.block_on(scraper.scrape_issue(volume, issue, |_, total, article, outcome| {
        let bar = pb.get_or_insert_with(|| progress_bar(total as u64));
        let title: String = article.title.chars().take(50).collect();
        match outcome {
            ArticleOutcome::Downloaded(_) => bar.println(format!("{} {}", "Downloaded".green(), title)),
            ArticleOutcome::AlreadyExists(_) => bar.println(format!("{} {}", "Exists".dimmed(), title)),
            ArticleOutcome::NoPdf => bar.println(format!("{} {}", "No PDF".yellow(), title)),
            ArticleOutcome::Failed(e) => bar.println(format!("{} {}: {}", "Failed".red(), title, e)),
        }
        bar.inc(1);
    }))?;
    if let Some(bar) = pb {
        bar.finish_and_clear();
    }

    if summary.total == 0 {
        println!("{}", "No articles found".yellow());
        return Ok(());
    }
    println!(
        "\n{} Downloaded {}/{} articles",
        "Done!".green().bold(),
        summary.successful,
        summary.total
    );
    println!("{}: {}", "Saved to".bold(), summary.issue_dir.display());
    Ok(())
}

fn cmd_titles(from: u32, to: u32, output: &Path, site: Site) -> CmdResult {
    if from > to {
        return Err(format!("--from ({}) must not exceed --to ({})", from, to).into());
    }
    let collector = TitleCollector::new(site)?;

    let pb = progress_bar(u64::from(to - from + 1));
    let records = runtime()?.block_on(collector.collect(from, to, |volume, count| {
        pb.println(format!("Volume {}: {} titles", volume, count));
        pb.inc(1);
    }))?;
    pb.finish_and_clear();

    let summary = export_titles(&records, output, ColumnOrder::TitleFirst)?;
    println!("{} {}", "Excel file created:".green().bold(), output.display());
    print!("{}", summary);
    Ok(())
}

fn cmd_issue_counts(from: u32, to: u32, site: Site) -> CmdResult {
    if from > to {
        return Err(format!("--from ({}) must not exceed --to ({})", from, to).into());
    }
    let collector = TitleCollector::new(site)?;
    let rt = runtime()?;
    for volume in (from..=to).rev() {
        let issues = rt.block_on(collector.max_issue(volume))?;
        if issues == 0 {
            println!("Volume {}: {}", volume, "no issues found".yellow());
        } else {
            println!("Volume {}: {} issue(s)", volume, issues);
        }
    }
    Ok(())
}

fn cmd_collect(roots: &[PathBuf], output: &Path) -> CmdResult {
    let records = collect_titles(roots);
    if records.is_empty() {
        println!("{}", "No PDF files found in the given folders".yellow());
        return Ok(());
    }
    println!("Found {} titles", records.len());

    let summary = export_titles(&records, output, ColumnOrder::VolumeFirst)?;
    println!("{} {}", "Excel file created:".green().bold(), output.display());
    print!("{}", summary);
    Ok(())
}

fn cmd_emails(
    input: &Path,
    options: &AuditOptions,
    export: Option<&Path>,
    show_details: bool,
    max_rows: usize,
) -> CmdResult {
    println!("Analyzing: {}", input.display());
    let report = audit_file(input, options)?;
    print!("{}", render_report(&report, show_details, max_rows));

    if let Some(path) = export {
        export_report(&report, path)?;
        println!("\n{} {}", "Exported report to:".green(), path.display());
    }

    if report.has_missing() {
        std::process::exit(1);
    }
    Ok(())
}
