//! CLI entry point for the math puzzle solver.
//!
//! Usage:
//!   math-puzzle solve <puzzle.json> [options]
//!   math-puzzle solve --stdin [options]
//!   math-puzzle solve --goal 24 --pieces 3,4,5,6 [--ops +,-,*,/] [--single-use]
//!   math-puzzle generate [--count n] [--seed s] [generator options]
//!   math-puzzle console
//!   math-puzzle survey [--reps n] [--seed s] [generator options]
//!
//! Budget options (all subcommands):
//!   --timeout-ms <ms>     Give up a search after this long
//!   --max-nodes <n>       Give up a search after visiting n positions
//!   --no-memo             Re-explore dead positions reached by another path
//!
//! Logs go to stderr; set RUST_LOG or pass -v/-vv/-vvv.

use std::fs;
use std::io::{self, BufRead, Read, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use tracing::info;
use tracing_subscriber::EnvFilter;

use math_puzzle::{
    generate_solvable, solve_with_config, survey, GeneratorConfig, Move, Operator, PuzzleState,
    SolverConfig, SolverResult, SurveyReport,
};

#[derive(Parser)]
#[command(name = "math-puzzle")]
#[command(about = "Solve and generate combine-the-pieces arithmetic puzzles")]
#[command(version)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Solve one puzzle and print the moves as JSON
    Solve {
        /// Path to puzzle JSON file (use --stdin to read from stdin)
        #[arg(value_name = "FILE")]
        file: Option<PathBuf>,

        /// Read puzzle from stdin instead of file
        #[arg(long)]
        stdin: bool,

        /// Goal value for an inline puzzle
        #[arg(long, allow_hyphen_values = true)]
        goal: Option<i32>,

        /// Comma-separated pieces for an inline puzzle
        #[arg(long, value_delimiter = ',', allow_hyphen_values = true)]
        pieces: Vec<i32>,

        /// Comma-separated operators for an inline puzzle (default: + - * / ^)
        #[arg(long, value_delimiter = ',')]
        ops: Vec<Operator>,

        /// Each operator of an inline puzzle may be used only once
        #[arg(long)]
        single_use: bool,

        #[command(flatten)]
        budget: BudgetArgs,
    },

    /// Generate random puzzles that the solver has checked
    Generate {
        /// Number of puzzles to generate
        #[arg(long, default_value = "1")]
        count: usize,

        /// Seed for reproducible output
        #[arg(long)]
        seed: Option<u64>,

        #[command(flatten)]
        generator: GeneratorArgs,

        #[command(flatten)]
        budget: BudgetArgs,
    },

    /// Read "goal piece piece ..." lines from stdin and print solutions
    Console {
        #[command(flatten)]
        budget: BudgetArgs,
    },

    /// Roll random puzzles and report how many are solvable
    Survey {
        /// Number of puzzles to roll
        #[arg(long, default_value = "10000")]
        reps: usize,

        /// Seed for reproducible output
        #[arg(long)]
        seed: Option<u64>,

        #[command(flatten)]
        generator: GeneratorArgs,

        #[command(flatten)]
        budget: BudgetArgs,
    },
}

#[derive(Args)]
struct BudgetArgs {
    /// Maximum search time in milliseconds
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Maximum positions visited per search
    #[arg(long)]
    max_nodes: Option<usize>,

    /// Disable the dead-position table
    #[arg(long)]
    no_memo: bool,
}

impl BudgetArgs {
    fn solver_config(&self) -> SolverConfig {
        let mut config = SolverConfig::unbounded().with_memoization(!self.no_memo);
        if let Some(ms) = self.timeout_ms {
            config = config.with_timeout(Duration::from_millis(ms));
        }
        if let Some(max_nodes) = self.max_nodes {
            config = config.with_max_nodes(max_nodes);
        }
        config
    }
}

#[derive(Args)]
struct GeneratorArgs {
    /// Lowest goal (inclusive)
    #[arg(long, default_value = "20", allow_hyphen_values = true)]
    min_goal: i32,

    /// Highest goal (exclusive)
    #[arg(long, default_value = "70", allow_hyphen_values = true)]
    max_goal: i32,

    /// Pieces per puzzle
    #[arg(long, default_value = "5")]
    num_pieces: usize,

    /// Pieces are drawn from 1..=max-piece
    #[arg(long, default_value = "6")]
    max_piece: i32,

    /// Puzzles to try before accepting an unverified one
    #[arg(long, default_value = "20")]
    max_attempts: usize,
}

impl GeneratorArgs {
    fn config(&self) -> GeneratorConfig {
        GeneratorConfig {
            min_goal: self.min_goal,
            max_goal: self.max_goal,
            num_pieces: self.num_pieces,
            max_piece: self.max_piece,
            max_attempts: self.max_attempts,
        }
    }
}

/// Output format for a solve
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SolveOutput {
    puzzle: PuzzleState,
    solvable: bool,
    search_exhausted: bool,
    nodes_explored: usize,
    time_elapsed_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    moves: Option<Vec<Move>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    steps: Option<Vec<StepOutput>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct StepOutput {
    description: String,
    pieces: Vec<i32>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SurveyOutput {
    #[serde(flatten)]
    report: SurveyReport,
    solvable_percent: f64,
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Solve {
            file,
            stdin,
            goal,
            pieces,
            ops,
            single_use,
            budget,
        } => {
            let puzzle = load_puzzle(file, stdin, goal, pieces, ops, single_use)?;
            let result = solve_with_config(&puzzle, &budget.solver_config());
            let output = format_result(puzzle, &result)?;

            println!("{}", serde_json::to_string_pretty(&output)?);

            Ok(if result.is_solvable() {
                ExitCode::SUCCESS
            } else if result.is_inconclusive() {
                ExitCode::from(2)
            } else {
                ExitCode::FAILURE
            })
        }
        Commands::Generate {
            count,
            seed,
            generator,
            budget,
        } => {
            let config = generator.config();
            let solver_config = budget.solver_config();
            let mut rng = make_rng(seed);

            let puzzles = (0..count)
                .map(|_| generate_solvable(&config, &solver_config, &mut rng))
                .collect::<Result<Vec<_>, _>>()?;
            info!(count = puzzles.len(), "generated puzzles");

            println!("{}", serde_json::to_string_pretty(&puzzles)?);
            Ok(ExitCode::SUCCESS)
        }
        Commands::Console { budget } => {
            run_console(&budget.solver_config())?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Survey {
            reps,
            seed,
            generator,
            budget,
        } => {
            let mut rng = make_rng(seed);
            let report = survey(&generator.config(), &budget.solver_config(), reps, &mut rng)?;
            let output = SurveyOutput {
                solvable_percent: report.solvable_percent(),
                report,
            };

            println!("{}", serde_json::to_string_pretty(&output)?);
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn make_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    }
}

fn load_puzzle(
    file: Option<PathBuf>,
    stdin: bool,
    goal: Option<i32>,
    pieces: Vec<i32>,
    ops: Vec<Operator>,
    single_use: bool,
) -> Result<PuzzleState> {
    if let Some(goal) = goal {
        let ops = if ops.is_empty() {
            Operator::DEFAULTS.to_vec()
        } else {
            ops
        };
        return PuzzleState::new(pieces, ops, goal, !single_use).context("invalid puzzle");
    }

    let json_content = if stdin {
        let mut buffer = String::new();
        io::stdin()
            .read_to_string(&mut buffer)
            .context("failed to read from stdin")?;
        buffer
    } else if let Some(path) = file {
        fs::read_to_string(&path).with_context(|| format!("failed to read {}", path.display()))?
    } else {
        bail!("provide a puzzle file, --stdin, or --goal with --pieces");
    };

    serde_json::from_str(&json_content).context("failed to parse puzzle JSON")
}

fn format_result(puzzle: PuzzleState, result: &SolverResult) -> Result<SolveOutput> {
    let steps = match &result.solution {
        Some(moves) => Some(replay_steps(&puzzle, moves)?),
        None => None,
    };

    Ok(SolveOutput {
        solvable: result.is_solvable(),
        search_exhausted: result.search_exhausted,
        nodes_explored: result.nodes_explored,
        time_elapsed_ms: result.time_elapsed_ms,
        moves: result.solution.clone(),
        steps,
        puzzle,
    })
}

/// Apply `moves` to a copy of `puzzle`, recording each step.
fn replay_steps(puzzle: &PuzzleState, moves: &[Move]) -> Result<Vec<StepOutput>> {
    let mut state = puzzle.clone();
    let mut steps = Vec::with_capacity(moves.len());
    for &mv in moves {
        let description = state.describe_move(mv);
        state
            .apply(mv)
            .with_context(|| format!("solver produced an illegal move {mv}"))?;
        steps.push(StepOutput {
            description,
            pieces: state.pieces().to_vec(),
        });
    }
    Ok(steps)
}

fn run_console(solver_config: &SolverConfig) -> Result<()> {
    let stdin = io::stdin();
    let mut stdout = io::stdout().lock();

    for line in stdin.lock().lines() {
        let line = line.context("failed to read from stdin")?;
        let line = line.trim();
        if line == "q" {
            break;
        }
        if line.is_empty() {
            continue;
        }

        let puzzle = match parse_console_line(line) {
            Ok(puzzle) => puzzle,
            Err(e) => {
                writeln!(stdout, "Error: {e:#}")?;
                continue;
            }
        };

        match solve_with_config(&puzzle, solver_config).solution {
            None => writeln!(stdout, "No solution!")?,
            Some(moves) => {
                let mut state = puzzle;
                for mv in moves {
                    writeln!(stdout, "{}", state.describe_move(mv))?;
                    state
                        .apply(mv)
                        .with_context(|| format!("solver produced an illegal move {mv}"))?;
                    writeln!(stdout, "{state}\n----------------\n")?;
                }
            }
        }
        stdout.flush()?;
    }
    Ok(())
}

/// `goal piece piece ...` against the default operators
fn parse_console_line(line: &str) -> Result<PuzzleState> {
    let mut numbers = line.split_whitespace().map(|token| {
        token
            .parse::<i32>()
            .with_context(|| format!("'{token}' is not an integer"))
    });
    let goal = match numbers.next() {
        Some(goal) => goal?,
        None => bail!("expected a goal followed by pieces"),
    };
    let pieces = numbers.collect::<Result<Vec<_>>>()?;
    Ok(PuzzleState::with_default_ops(pieces, goal)?)
}
