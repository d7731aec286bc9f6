use clap::{Args as ClapArgs, Parser, Subcommand};
use mse_core::{DecodeOptions, EditError, EditSession, ExportError};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(
    name = "mse-cli",
    about = "Dump, check and re-encode binary mod settings files",
    version
)]
struct Cli {
    #[command(subcommand)]
    cmd: Cmd,
    /// Max dictionary nesting accepted when decoding
    #[arg(long, global = true, default_value_t = 64)]
    max_depth: usize,
    /// More log output on stderr (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Dump a settings file as the editor JSON tree
    Dump(DumpArgs),
    /// Get value at JSON pointer
    Get(PointerArgs),
    /// List children at JSON pointer
    List(PointerArgs),
    /// Set value (raw JSON) at JSON pointer; validates, then prints or writes with --out
    Set(SetArgs),
    /// Check an edited JSON tree against the original settings file
    Check(CheckArgs),
    /// Validate an edited JSON tree and encode it back to the binary format
    Write(WriteArgs),
}

#[derive(ClapArgs, Debug)]
struct DumpArgs {
    /// Settings file to dump
    path: PathBuf,
    /// Single-line JSON instead of pretty-printed
    #[arg(long, default_value_t = false)]
    compact: bool,
    /// Indented key/kind/value listing instead of JSON
    #[arg(long, default_value_t = false, conflicts_with = "compact")]
    tree: bool,
}

#[derive(ClapArgs, Debug)]
struct PointerArgs {
    /// Settings file or JSON tree to load
    path: PathBuf,
    /// JSON Pointer, e.g. /root/some/key/VALUE
    #[arg(long, default_value = "/root")]
    ptr: String,
}

#[derive(ClapArgs, Debug)]
struct SetArgs {
    /// Settings file to edit
    path: PathBuf,
    /// JSON Pointer, e.g. /root/some/key/VALUE
    #[arg(long)]
    ptr: String,
    /// New value as raw JSON (e.g., 123, true, "str")
    #[arg(long)]
    value: String,
    /// Output settings file; otherwise the edited tree is printed
    #[arg(long)]
    out: Option<PathBuf>,
    /// Skip the zip backup of an existing output file
    #[arg(long, default_value_t = false)]
    no_backup: bool,
}

#[derive(ClapArgs, Debug)]
struct CheckArgs {
    /// Original settings file
    #[arg(long, value_name = "DAT")]
    reference: PathBuf,
    /// Edited JSON tree
    #[arg(long, value_name = "JSON")]
    candidate: PathBuf,
}

#[derive(ClapArgs, Debug)]
struct WriteArgs {
    /// Original settings file the edits are checked against
    #[arg(long, value_name = "DAT")]
    reference: PathBuf,
    /// Edited JSON tree (from dump)
    #[arg(long, value_name = "JSON")]
    input: PathBuf,
    /// Output settings file
    #[arg(long, value_name = "DAT", default_value = mse_core::DEFAULT_EXPORT_NAME)]
    output: PathBuf,
    /// Skip the zip backup of an existing output file
    #[arg(long, default_value_t = false)]
    no_backup: bool,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    let opts = DecodeOptions {
        max_depth: cli.max_depth,
    };
    match cli.cmd {
        Cmd::Dump(a) => cmd_dump(a, opts),
        Cmd::Get(a) => cmd_get(a, opts),
        Cmd::List(a) => cmd_list(a, opts),
        Cmd::Set(a) => cmd_set(a, opts),
        Cmd::Check(a) => cmd_check(a, opts),
        Cmd::Write(a) => cmd_write(a, opts),
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::INFO,
        2 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();
}

fn fail(code: i32, msg: impl std::fmt::Display) -> ! {
    eprintln!("error: {}", msg);
    std::process::exit(code);
}

fn load_session(path: &Path, opts: DecodeOptions) -> EditSession {
    let data = std::fs::read(path).unwrap_or_else(|e| fail(2, format!("{}: {}", path.display(), e)));
    EditSession::load(&data, opts).unwrap_or_else(|e| fail(2, format!("{}: {}", path.display(), e)))
}

fn load_tree(path: &Path) -> serde_json::Value {
    let data = std::fs::read_to_string(path).unwrap_or_else(|e| fail(2, format!("{}: {}", path.display(), e)));
    serde_json::from_str(&data).unwrap_or_else(|e| fail(3, format!("invalid JSON: {}", e)))
}

fn print_json(v: &serde_json::Value) {
    match serde_json::to_string_pretty(v) {
        Ok(s) => println!("{}", s),
        Err(e) => fail(5, e),
    }
}

fn report_violations(violations: &[mse_core::Violation]) {
    for v in violations {
        eprintln!("{}", v);
    }
}

fn write_output(out: &Path, bytes: &[u8], backup: bool) {
    if backup && out.is_file() {
        match mse_core::backup::backup_file(out) {
            Ok(zip) => info!(backup = %zip.display(), "backed up existing output"),
            Err(e) => fail(5, format!("backup failed: {}", e)),
        }
    }
    std::fs::write(out, bytes).unwrap_or_else(|e| fail(5, format!("{}: {}", out.display(), e)));
    info!(path = %out.display(), bytes = bytes.len(), "wrote settings");
}

fn export_or_fail(session: &EditSession) -> Vec<u8> {
    match session.export() {
        Ok(bytes) => bytes,
        Err(ExportError::Rejected(v)) => {
            report_violations(&v);
            fail(4, "please use correct value types");
        }
        Err(e) => fail(4, e),
    }
}

fn cmd_dump(args: DumpArgs, opts: DecodeOptions) {
    let session = load_session(&args.path, opts);
    if args.tree {
        print!("{}", session.reference().pretty());
    } else {
        let json_opts = mse_core::JsonOpts {
            pretty: !args.compact,
        };
        println!("{}", mse_core::dump_json(session.reference(), json_opts));
    }
}

fn cmd_get(args: PointerArgs, opts: DecodeOptions) {
    let v = mse_core::parse_file_to_json_value(&args.path, opts).unwrap_or_else(|e| fail(2, e));
    match mse_core::get_by_pointer(&v, &args.ptr) {
        Some(x) => print_json(&x),
        None => fail(3, format!("not found: {}", args.ptr)),
    }
}

fn cmd_list(args: PointerArgs, opts: DecodeOptions) {
    let v = mse_core::parse_file_to_json_value(&args.path, opts).unwrap_or_else(|e| fail(2, e));
    let children = mse_core::list_children(&v, &args.ptr).unwrap_or_else(|e| fail(3, e));
    for c in children {
        let kind = match c.kind {
            mse_core::NodeKind::Dict => "DICT".to_string(),
            mse_core::NodeKind::Leaf(tag) => mse_core::Kind::from_tag(tag)
                .map(|k| k.to_string())
                .unwrap_or_else(|| format!("tag {}", tag)),
            mse_core::NodeKind::Scalar => "scalar".to_string(),
        };
        println!(
            "{}\t{}{}",
            c.key,
            kind,
            c.len.map(|n| format!("\t(len={})", n)).unwrap_or_default()
        );
    }
}

fn cmd_set(args: SetArgs, opts: DecodeOptions) {
    let mut session = load_session(&args.path, opts);
    let new_val: serde_json::Value = serde_json::from_str(&args.value)
        .unwrap_or_else(|e| fail(3, format!("invalid --value JSON: {}", e)));
    match session.apply_edit(&args.ptr, new_val) {
        Ok(()) => {}
        Err(EditError::Rejected(v)) => {
            report_violations(&v);
            fail(4, "edit rejected");
        }
        Err(e) => fail(4, e),
    }
    match args.out {
        Some(out) => write_output(&out, &export_or_fail(&session), !args.no_backup),
        None => print_json(session.tree()),
    }
}

fn cmd_check(args: CheckArgs, opts: DecodeOptions) {
    let session = load_session(&args.reference, opts);
    let candidate = load_tree(&args.candidate);
    let violations = session.validate(&candidate);
    if violations.is_empty() {
        println!("ok");
    } else {
        for v in &violations {
            println!("{}", v);
        }
        warn!(count = violations.len(), "candidate does not conform");
        std::process::exit(1);
    }
}

fn cmd_write(args: WriteArgs, opts: DecodeOptions) {
    let mut session = load_session(&args.reference, opts);
    let candidate = load_tree(&args.input);
    if let Err(e) = session.set_tree(candidate) {
        if let EditError::Rejected(v) = &e {
            report_violations(v);
        }
        fail(4, e);
    }
    let bytes = export_or_fail(&session);
    write_output(&args.output, &bytes, !args.no_backup);
}
