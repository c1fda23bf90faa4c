use std::{io::Write, path::PathBuf};

use anyhow::Context;
use clap::{ArgAction, Parser, ValueEnum};
use env_logger::Env;
use similar::TextDiff;
use typed_arena::Arena;

use local_cse::{
    alias::{AliasOracle, BasicAliasOracle, ConservativeAliasOracle},
    ir::opt::{cse::LocalCse, FunctionPass},
    parser::parse_module,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum AliasMode {
    /// gep decomposition with allocas and globals as identified objects
    Basic,
    /// only identical locations are known to overlap
    Conservative,
}

#[derive(Parser)]
#[command(
    name = "local-cse",
    version,
    about = "Block-local common subexpression elimination over a textual SSA IR"
)]
struct Args {
    /// IR files to transform
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Alias oracle deciding whether a store clobbers an earlier load
    #[arg(long, value_enum, default_value_t = AliasMode::Basic)]
    alias: AliasMode,

    /// Print a unified diff instead of the rewritten IR
    #[arg(long)]
    diff: bool,

    /// Run the pass a second time and fail if it reports a change
    #[arg(long)]
    verify_idempotent: bool,

    /// Raise the log level (-v for debug, -vv for trace); RUST_LOG wins
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let default_filter = match args.verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(Env::default().default_filter_or(default_filter)).init();

    // every input is parsed before anything is printed
    let sources = Arena::new();
    let mut modules = Vec::with_capacity(args.inputs.len());
    for path in args.inputs.iter() {
        let src: &str = sources.alloc(
            std::fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?,
        );
        let functions =
            parse_module(src).with_context(|| format!("failed to parse {}", path.display()))?;
        log::debug!("[driver] {}: {} function(s)", path.display(), functions.len());

        modules.push((path, functions));
    }

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    for (path, functions) in modules.iter_mut() {
        for f in functions.iter_mut() {
            let before = f.dump_to_string();

            let oracle: Box<dyn AliasOracle> = match args.alias {
                AliasMode::Basic => Box::new(BasicAliasOracle::analyze(f)),
                AliasMode::Conservative => Box::new(ConservativeAliasOracle),
            };
            let mut pass = LocalCse::new(&*oracle);
            let modified = pass.run(f);
            log::info!(
                "[{}] @{} in {}: modified={modified}",
                pass.name(),
                f.name,
                path.display()
            );

            if args.verify_idempotent && pass.run(f) {
                anyhow::bail!(
                    "{} is not idempotent on @{} in {}",
                    pass.name(),
                    f.name,
                    path.display()
                );
            }

            let after = f.dump_to_string();
            if args.diff {
                let old_header = format!("{}:@{}", path.display(), f.name);
                let new_header = format!("{old_header} (after {})", pass.name());
                let diff = TextDiff::from_lines(&before, &after);
                write!(
                    out,
                    "{}",
                    diff.unified_diff().header(&old_header, &new_header)
                )?;
            } else {
                out.write_all(after.as_bytes())?;
            }
        }
    }

    Ok(())
}
