use anyhow::{anyhow, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{debug, error, info};

use enumgen::code_builder::{IndentMode, NewlineMode, DEFAULT_INDENT_SIZE};
use enumgen::identifier::try_create_identifier;
use enumgen::{
    describe_to_json, generate, CurlyBracketMode, ExportOptions, HeaderMode, MappingContext,
    OutputKind, StorageType,
};

#[derive(Parser)]
#[command(name = "enumgen", version)]
#[command(about = "Generate C#, F#, Visual Basic, CIL or class-library enums from json", long_about = None)]
struct Cli {
    /// Log debug output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Map a json file to an enum and write it in the chosen output format
    Generate(GenerateArgs),

    /// Print the enums declared in a generated class library as json
    Inspect {
        /// Input `.dll` file
        #[arg(short, long)]
        input: PathBuf,
    },
}

#[derive(Args)]
struct GenerateArgs {
    /// Input json file
    #[arg(short, long)]
    input: PathBuf,

    /// Output file; its name (minus extension and a trailing `.g`) names the enum
    #[arg(short, long)]
    output: PathBuf,

    #[arg(short = 't', long, value_enum, default_value_t = OutputType::CSharp)]
    output_type: OutputType,

    /// Path to the collection of entries
    #[arg(short, long, default_value = "[*]")]
    collection_path: String,

    /// Path to the entry name, relative to an entry
    #[arg(short, long, default_value = "name")]
    entry_name: String,

    /// Path to the entry value, relative to an entry
    #[arg(long)]
    entry_value: Option<String>,

    /// Path to the entry comment, relative to an entry
    #[arg(long)]
    entry_comment: Option<String>,

    /// Comment for the enum itself
    #[arg(long)]
    comment: Option<String>,

    #[arg(short, long)]
    namespace: Option<String>,

    /// Assembly name for cil and class-library output (defaults to the enum name)
    #[arg(long)]
    assembly_name: Option<String>,

    #[arg(long, value_enum, default_value_t = HeaderArg::Default)]
    header_mode: HeaderArg,

    #[arg(long, value_enum, default_value_t = IndentArg::Spaces)]
    indent_mode: IndentArg,

    #[arg(long, default_value_t = DEFAULT_INDENT_SIZE)]
    indent_size: usize,

    #[arg(long, value_enum, default_value_t = NewlineArg::Unix)]
    newline_mode: NewlineArg,

    #[arg(short, long, value_enum, default_value_t = StorageArg::Implicit)]
    storage_type: StorageArg,

    #[arg(long, value_enum, default_value_t = CurlyBracketArg::NewLine)]
    curly_bracket: CurlyBracketArg,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, ValueEnum)]
enum OutputType {
    #[value(name = "csharp")]
    CSharp,
    #[value(name = "fsharp")]
    FSharp,
    VisualBasic,
    Cil,
    ClassLibrary,
}

impl OutputType {
    fn kind(self) -> OutputKind {
        match self {
            OutputType::CSharp       => OutputKind::CSharp,
            OutputType::FSharp       => OutputKind::FSharp,
            OutputType::VisualBasic  => OutputKind::VisualBasic,
            OutputType::Cil          => OutputKind::Cil,
            OutputType::ClassLibrary => OutputKind::ClassLibrary,
        }
    }

    fn required_extension(self) -> &'static str {
        match self {
            OutputType::CSharp       => ".cs",
            OutputType::FSharp       => ".fs",
            OutputType::VisualBasic  => ".vb",
            OutputType::Cil          => ".il",
            OutputType::ClassLibrary => ".dll",
        }
    }

    fn desired_extension(self) -> &'static str {
        match self {
            OutputType::CSharp       => ".g.cs",
            OutputType::FSharp       => ".g.fs",
            OutputType::VisualBasic  => ".g.vb",
            OutputType::Cil          => ".g.il",
            OutputType::ClassLibrary => ".dll",
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, ValueEnum)]
enum HeaderArg {
    Default,
    None,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, ValueEnum)]
enum IndentArg {
    Spaces,
    Tabs,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, ValueEnum)]
enum NewlineArg {
    Unix,
    Windows,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, ValueEnum)]
enum CurlyBracketArg {
    NewLine,
    SameLine,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, ValueEnum)]
enum StorageArg {
    Implicit,
    #[value(name = "signed8bit")]
    Signed8Bit,
    #[value(name = "unsigned8bit")]
    Unsigned8Bit,
    #[value(name = "signed16bit")]
    Signed16Bit,
    #[value(name = "unsigned16bit")]
    Unsigned16Bit,
    #[value(name = "signed32bit")]
    Signed32Bit,
    #[value(name = "unsigned32bit")]
    Unsigned32Bit,
    #[value(name = "signed64bit")]
    Signed64Bit,
    #[value(name = "unsigned64bit")]
    Unsigned64Bit,
}

impl From<StorageArg> for StorageType {
    fn from(arg: StorageArg) -> StorageType {
        match arg {
            StorageArg::Implicit      => StorageType::Implicit,
            StorageArg::Signed8Bit    => StorageType::Signed8Bit,
            StorageArg::Unsigned8Bit  => StorageType::Unsigned8Bit,
            StorageArg::Signed16Bit   => StorageType::Signed16Bit,
            StorageArg::Unsigned16Bit => StorageType::Unsigned16Bit,
            StorageArg::Signed32Bit   => StorageType::Signed32Bit,
            StorageArg::Unsigned32Bit => StorageType::Unsigned32Bit,
            StorageArg::Signed64Bit   => StorageType::Signed64Bit,
            StorageArg::Unsigned64Bit => StorageType::Unsigned64Bit,
        }
    }
}

impl GenerateArgs {
    fn mapping_context(&self) -> MappingContext {
        MappingContext {
            collection_path:    self.collection_path.clone(),
            entry_name_path:    self.entry_name.clone(),
            entry_value_path:   self.entry_value.clone(),
            entry_comment_path: self.entry_comment.clone(),
        }
    }

    fn export_options(&self) -> ExportOptions {
        ExportOptions {
            namespace:     self.namespace.clone(),
            header:        match self.header_mode {
                HeaderArg::Default => HeaderMode::Default,
                HeaderArg::None    => HeaderMode::None,
            },
            indent:        match self.indent_mode {
                IndentArg::Spaces => IndentMode::Spaces,
                IndentArg::Tabs   => IndentMode::Tabs,
            },
            indent_size:   self.indent_size,
            newline:       match self.newline_mode {
                NewlineArg::Unix    => NewlineMode::Unix,
                NewlineArg::Windows => NewlineMode::Windows,
            },
            storage:       self.storage_type.into(),
            curly_bracket: match self.curly_bracket {
                CurlyBracketArg::NewLine  => CurlyBracketMode::NewLine,
                CurlyBracketArg::SameLine => CurlyBracketMode::SameLine,
            },
            assembly_name: self.assembly_name.clone(),
        }
    }
}

/// The output file name without its extension and without a trailing `.g`.
fn enum_name_for(output: &Path) -> Result<String> {
    let stem = output
        .file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(|| anyhow!("unable to get a file name from path {}", output.display()))?;
    let stem = match stem.len().checked_sub(2) {
        Some(cut) if stem.is_char_boundary(cut) && stem[cut..].eq_ignore_ascii_case(".g") => &stem[..cut],
        _ => stem,
    };

    let name = try_create_identifier(stem)
        .ok_or_else(|| anyhow!("unable to create a valid identifier from file name \"{}\"", stem))?;
    debug!("Generated enum-name: {} from file-name: {}", name, stem);
    Ok(name)
}

/// `output` with the desired extension appended unless it already ends with
/// the required one.
fn output_path_for(output: &Path, output_type: OutputType) -> PathBuf {
    let required = output_type.required_extension();
    let text = output.to_string_lossy();
    let has_required = text.len() >= required.len()
        && text.is_char_boundary(text.len() - required.len())
        && text[text.len() - required.len()..].eq_ignore_ascii_case(required);
    if has_required {
        output.to_path_buf()
    } else {
        let mut path = output.as_os_str().to_owned();
        path.push(output_type.desired_extension());
        PathBuf::from(path)
    }
}

fn run_generate(args: &GenerateArgs) -> Result<()> {
    let json = fs::read_to_string(&args.input)
        .with_context(|| format!("failed to read input file {}", args.input.display()))?;
    debug!("{} characters read from: {}", json.len(), args.input.display());

    let enum_name = enum_name_for(&args.output)?;
    let bytes = generate(
        &json,
        &args.mapping_context(),
        &enum_name,
        args.comment.as_deref(),
        args.output_type.kind(),
        &args.export_options(),
    )
    .with_context(|| format!("failed to generate {:?} enum {}", args.output_type, enum_name))?;

    let path = output_path_for(&args.output, args.output_type);
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).with_context(|| format!("failed to create directory {}", parent.display()))?;
    }
    fs::write(&path, &bytes).with_context(|| format!("failed to write output file {}", path.display()))?;
    info!("Written enum to: {}", path.display());
    Ok(())
}

fn run_inspect(input: &Path) -> Result<()> {
    let image = fs::read(input).with_context(|| format!("failed to read input file {}", input.display()))?;
    let json = describe_to_json(&image).with_context(|| format!("failed to inspect {}", input.display()))?;
    println!("{}", json);
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .try_init();

    let result = match &cli.command {
        Commands::Generate(args) => run_generate(args),
        Commands::Inspect { input } => run_inspect(input),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}
