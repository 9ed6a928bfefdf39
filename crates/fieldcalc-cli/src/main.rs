//! fieldcalc CLI - formula evaluation and project calculation tool

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use fieldcalc::prelude::*;
use serde::{Deserialize, Serialize};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "fieldcalc")]
#[command(
    author,
    version,
    about = "Evaluate formulas, calculated fields and control rules"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate a single formula
    Eval {
        /// Formula text
        formula: String,

        /// Field value as name=value (repeatable)
        #[arg(short, long = "set", value_name = "NAME=VALUE")]
        set: Vec<String>,
    },

    /// List the fields a formula references
    Deps {
        /// Formula text
        formula: String,
    },

    /// Calculate a project file and evaluate its rules
    Project {
        /// Project file (JSON with fields, rules and values)
        input: PathBuf,

        /// Keep only the highest priority effect per field
        #[arg(short, long)]
        resolve: bool,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the calculation order of a project file
    Order {
        /// Project file
        input: PathBuf,
    },
}

/// Project file layout
#[derive(Debug, Default, Deserialize)]
struct Project {
    #[serde(default)]
    fields: Vec<FieldDefinition>,
    #[serde(default)]
    rules: Vec<ControlRule>,
    #[serde(default)]
    values: FieldValues,
}

/// Result of calculating a project
#[derive(Debug, Serialize)]
struct ProjectReport {
    calculated: Vec<(String, Value)>,
    effects: Vec<ControlEffect>,
    errors: Vec<String>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let stdout = io::stdout();
    let mut out = stdout.lock();

    match cli.command {
        Commands::Eval { formula, set } => eval_formula(&formula, &set, &mut out),
        Commands::Deps { formula } => list_dependencies(&formula, &mut out),
        Commands::Project {
            input,
            resolve,
            json,
        } => {
            let report = calculate_project(&input, resolve)?;
            if json {
                serde_json::to_writer_pretty(&mut out, &report)
                    .context("Failed to write report")?;
                writeln!(out)?;
            } else {
                write_report(&report, &mut out)?;
            }
            for error in &report.errors {
                eprintln!("Warning: {}", error);
            }
            Ok(())
        }
        Commands::Order { input } => print_order(&input, &mut out),
    }
}

/// Parse `name=value` assignments into field values
fn parse_assignments(assignments: &[String]) -> Result<FieldValues> {
    let mut values = FieldValues::new();
    for assignment in assignments {
        let Some((name, value)) = assignment.split_once('=') else {
            bail!("Invalid assignment '{}', expected NAME=VALUE", assignment);
        };
        let name = name.trim();
        if name.is_empty() {
            bail!("Invalid assignment '{}', field name is empty", assignment);
        }
        values.insert(name.to_string(), Value::parse_literal(value));
    }
    Ok(values)
}

fn eval_formula(formula: &str, assignments: &[String], out: &mut impl Write) -> Result<()> {
    let values = parse_assignments(assignments)?;
    let value = fieldcalc::evaluate_formula(formula, &values)
        .with_context(|| format!("Failed to evaluate '{}'", formula))?;
    writeln!(out, "{}", value)?;
    Ok(())
}

fn list_dependencies(formula: &str, out: &mut impl Write) -> Result<()> {
    let deps = fieldcalc::get_field_dependencies(formula)
        .with_context(|| format!("Failed to parse '{}'", formula))?;
    for dep in deps {
        writeln!(out, "{}", dep)?;
    }
    Ok(())
}

fn load_project(path: &Path) -> Result<Project> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read '{}'", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("Invalid project file '{}'", path.display()))
}

fn calculate_project(path: &Path, resolve: bool) -> Result<ProjectReport> {
    let project = load_project(path)?;

    let calculated = FormulaService::new()
        .evaluate_project_formulas(&project.fields, &project.values)
        .context("Failed to calculate fields")?;

    let mut values = project.values;
    let calculated: Vec<(String, Value)> = calculated.into_iter().collect();
    values.extend(calculated.iter().cloned());

    let result = fieldcalc::evaluate_rules(&project.rules, &values);
    let effects = if resolve {
        ControlEffectEvaluator::resolve_conflicts(&result.effects)
    } else {
        result.effects
    };

    Ok(ProjectReport {
        calculated,
        effects,
        errors: result.errors,
    })
}

fn write_report(report: &ProjectReport, out: &mut impl Write) -> Result<()> {
    for (field, value) in &report.calculated {
        writeln!(out, "{}\t{}", field, value)?;
    }
    if !report.effects.is_empty() {
        writeln!(out)?;
        for effect in &report.effects {
            writeln!(
                out,
                "{}\t{}\t{}",
                effect.target_field_id, effect.control_type, effect.value
            )?;
        }
    }
    Ok(())
}

fn print_order(path: &Path, out: &mut impl Write) -> Result<()> {
    let project = load_project(path)?;
    let order = FormulaService::new()
        .calculation_order(&project.fields)
        .context("Failed to order fields")?;
    for field in order {
        writeln!(out, "{}", field)?;
    }
    Ok(())
}
