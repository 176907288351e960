//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - parses CLI arguments and installs logging
//! - loads CSV inputs and runs the curve transforms
//! - talks to the engine for scenario, parameter and curve commands
//! - prints reports or writes exports

use std::collections::BTreeMap;
use std::io::Write;
use std::path::Path;

use clap::Parser;
use serde_json::{Map, Value};
use tracing::info;

use crate::cli::{
    BalanceArgs, CategoriseArgs, Cli, Command, CurvesArgs, CustomCurveCommand, GlobalArgs, GqueryArgs, LoadsArgs,
    MycCommand, NodeArgs, OutputArgs, ParamsCommand, RegionaliseArgs, SavedCommand, ScenarioCommand,
    ScenarioSettings,
};
use crate::config::EngineConfig;
use crate::domain::{CurveSet, NodeRef, ScenarioId, UnmappedPolicy};
use crate::engine::{EngineSession, NewSavedScenario, NewScenario};
use crate::error::AppError;
use crate::io::{load_curves, load_mapping, load_parameters, save_curves, save_parameters, write_curves, write_parameters};
use crate::myc::{ScenarioPool, make_myc_url};
use crate::report;
use crate::transform::{
    BALANCE_PRECISION, CategoriseOptions, check_hourly_balance, node_loads, regionalise, regionalise_node,
};

pub mod pipeline;

/// Entry point for the `etm` binary.
pub fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    crate::logging::init_tracing(cli.global.verbose, cli.global.log_json);

    match cli.command {
        Command::Categorise(args) => handle_categorise(args),
        Command::Regionalise(args) => handle_regionalise(args),
        Command::Node(args) => handle_node(args),
        Command::Loads(args) => handle_loads(args),
        Command::Balance(args) => handle_balance(args),
        Command::Scenario(cmd) => handle_scenario(&cli.global, cmd),
        Command::Saved(cmd) => handle_saved(&cli.global, cmd),
        Command::Curves(args) => handle_curves(&cli.global, args),
        Command::Params(cmd) => handle_params(&cli.global, cmd),
        Command::Gquery(args) => handle_gquery(&cli.global, args),
        Command::CustomCurve(cmd) => handle_custom_curve(&cli.global, cmd),
        Command::Myc(cmd) => handle_myc(&cli.global, cmd),
    }
}

fn handle_categorise(args: CategoriseArgs) -> Result<(), AppError> {
    let curves = load_curves(&args.curves)?;
    let mapping = load_mapping(&args.mapping)?;
    let options = CategoriseOptions {
        column: args.column,
        unmapped: args.unmapped,
        flow_sign: args.flow_sign,
    };

    let out = pipeline::categorise_with(&curves, &mapping, &options, args.keep_keys)?;
    emit_curves(&out, &args.out)
}

fn handle_regionalise(args: RegionaliseArgs) -> Result<(), AppError> {
    let run = pipeline::load_fraction_input(&args.input)?;
    let excluded = pipeline::resolve_node(&run.fractions, &args.exclude);
    let out = regionalise(&run.curves, &run.fractions, &excluded)?;
    emit_curves(&out, &args.out)
}

fn handle_node(args: NodeArgs) -> Result<(), AppError> {
    let run = pipeline::load_fraction_input(&args.input)?;
    let node = pipeline::resolve_node(&run.fractions, &args.node);
    let out = regionalise_node(&run.curves, &run.fractions, &node)?;
    emit_curves(&out, &args.out)
}

fn handle_loads(args: LoadsArgs) -> Result<(), AppError> {
    let run = pipeline::load_fraction_input(&args.input)?;
    let nodes: Option<Vec<NodeRef>> = args.nodes.as_ref().map(|nodes| {
        nodes
            .iter()
            .map(|n| pipeline::resolve_node(&run.fractions, n))
            .collect()
    });
    let out = node_loads(&run.curves, &run.fractions, nodes.as_deref())?;
    emit_curves(&out, &args.out)
}

fn handle_balance(args: BalanceArgs) -> Result<(), AppError> {
    let curves = load_curves(&args.curves)?;
    let balanced = check_hourly_balance(&curves, args.precision, args.errors)?;
    println!(
        "{} rows: {}",
        curves.n_rows(),
        if balanced { "balanced" } else { "unbalanced" }
    );
    Ok(())
}

fn handle_scenario(global: &GlobalArgs, cmd: ScenarioCommand) -> Result<(), AppError> {
    let session = connect(global)?;

    match cmd {
        ScenarioCommand::List => print!("{}", report::format_scenario_list(&session.my_scenarios()?)),
        ScenarioCommand::Create {
            area,
            end_year,
            settings,
        } => {
            let new = NewScenario {
                area_code: area,
                end_year,
                metadata: metadata_from(&settings)?,
                keep_compatible: settings.keep_compatible,
                private: settings.private,
            };
            let header = session.create_scenario(&new)?;
            print!("{}", report::format_header(&header));
        }
        ScenarioCommand::Copy { id, settings } => {
            let metadata = metadata_from(&settings)?;
            let header = session.copy_scenario(id, metadata.as_ref(), settings.keep_compatible, settings.private)?;
            print!("{}", report::format_header(&header));
        }
        ScenarioCommand::Show { id } => {
            print!("{}", report::format_header(&session.scenario_header(id)?));
        }
        ScenarioCommand::Delete { id } => session.delete_scenario(id)?,
        ScenarioCommand::Reset { id } => {
            session.reset_scenario(id)?;
            info!(scenario = %id, "reset scenario");
        }
        ScenarioCommand::Interpolate { id, year } => {
            let header = session.interpolate_scenario(id, year)?;
            print!("{}", report::format_header(&header));
        }
        ScenarioCommand::Url { id, load } => println!("{}", session.gui_url(id, load)?),
    }
    Ok(())
}

fn handle_saved(global: &GlobalArgs, cmd: SavedCommand) -> Result<(), AppError> {
    let session = connect(global)?;

    match cmd {
        SavedCommand::List => print!("{}", report::format_saved_scenarios(&session.my_saved_scenarios()?)),
        SavedCommand::Show { id } => print!("{}", report::format_saved_scenarios(&[session.saved_scenario(id)?])),
        SavedCommand::Create {
            scenario,
            title,
            private,
            description,
        } => {
            let new = NewSavedScenario {
                scenario_id: scenario,
                title,
                private,
                description,
            };
            print!("{}", report::format_saved_scenarios(&[session.create_saved_scenario(&new)?]));
        }
        SavedCommand::Update { id, scenario } => {
            print!("{}", report::format_saved_scenarios(&[session.to_saved_scenario(id, scenario)?]));
        }
        SavedCommand::Delete { id } => session.delete_saved_scenario(id)?,
    }
    Ok(())
}

fn handle_curves(global: &GlobalArgs, args: CurvesArgs) -> Result<(), AppError> {
    let session = connect(global)?;
    let curves = if args.price {
        session.electricity_price(args.id)?
    } else if args.household_heat {
        session.household_heat_curves(args.id)?
    } else {
        session.hourly_curves(args.id, args.carrier)?
    };

    if args.check_balance {
        check_hourly_balance(&curves, BALANCE_PRECISION, crate::domain::ErrorHandling::Warn)?;
    }

    let curves = match &args.mapping {
        Some(path) => {
            let mapping = load_mapping(path)?;
            let options = CategoriseOptions {
                column: args.column.clone(),
                unmapped: if args.drop_unmapped {
                    UnmappedPolicy::Drop
                } else {
                    UnmappedPolicy::Strict
                },
                flow_sign: args.flow_sign,
            };
            pipeline::categorise_with(&curves, &mapping, &options, false)?
        }
        None => curves,
    };

    emit_curves(&curves, &args.out)
}

fn handle_params(global: &GlobalArgs, cmd: ParamsCommand) -> Result<(), AppError> {
    let session = connect(global)?;

    match cmd {
        ParamsCommand::List { id, all } => {
            let values = if all {
                session.scenario_parameters(id)?
            } else {
                session.user_values(id)?
            };
            print!("{}", report::format_parameters(&values));
        }
        ParamsCommand::Get { id, key } => {
            let input = session.input(id, &key)?;
            let text = serde_json::to_string_pretty(&input)
                .map_err(|e| AppError::new(4, format!("Failed to format input '{key}': {e}")))?;
            println!("{text}");
        }
        ParamsCommand::Set { id, values, file } => {
            let mut user_values = BTreeMap::new();
            if let Some(path) = &file {
                user_values.extend(parameter_column(path, id)?);
            }
            for raw in &values {
                let (key, value) = split_pair(raw)?;
                let value = value
                    .parse::<f64>()
                    .map_err(|_| AppError::new(2, format!("Value for '{key}' is not a number: '{value}'.")))?;
                user_values.insert(key, value);
            }
            if user_values.is_empty() {
                return Err(AppError::new(2, "No user values given."));
            }
            session.set_user_values(id, &user_values)?;
        }
        ParamsCommand::Order { id, kind, set } => {
            if let Some(order) = set {
                session.set_order(id, kind, &order)?;
            }
            for item in session.order(id, kind)? {
                println!("{item}");
            }
        }
    }
    Ok(())
}

fn handle_gquery(global: &GlobalArgs, args: GqueryArgs) -> Result<(), AppError> {
    let session = connect(global)?;
    let results = session.gquery_results(args.id, &args.gqueries)?;
    print!("{}", report::format_gqueries(&results));
    Ok(())
}

fn handle_custom_curve(global: &GlobalArgs, cmd: CustomCurveCommand) -> Result<(), AppError> {
    let session = connect(global)?;

    match cmd {
        CustomCurveCommand::List { id, all } => {
            let curves = session.custom_curves(id, all, false)?;
            print!("{}", report::format_custom_curves(&curves));
        }
        CustomCurveCommand::Get { id, key, output } => {
            let values = session.custom_curve(id, &key)?;
            let body: String = values.iter().map(|v| format!("{v}\n")).collect();
            match output {
                Some(path) => std::fs::write(&path, body)
                    .map_err(|e| AppError::new(2, format!("Failed to write '{}': {e}", path.display())))?,
                None => print!("{body}"),
            }
        }
        CustomCurveCommand::Upload { id, key, file, column } => {
            let curves = load_curves(&file)?;
            let name = match &column {
                Some(name) => name.as_str(),
                None => curves
                    .columns()
                    .first()
                    .map(String::as_str)
                    .ok_or_else(|| AppError::new(2, format!("'{}' has no curve columns.", file.display())))?,
            };
            let values = curves
                .column(name)
                .ok_or_else(|| AppError::new(2, format!("Column '{name}' not found in '{}'.", file.display())))?;
            let filename = file.file_name().and_then(|f| f.to_str());
            session.upload_custom_curve(id, &key, values, filename)?;
        }
        CustomCurveCommand::Delete { id, key } => {
            session.delete_custom_curve(id, &key)?;
        }
    }
    Ok(())
}

fn handle_myc(global: &GlobalArgs, cmd: MycCommand) -> Result<(), AppError> {
    match cmd {
        MycCommand::Apply { file, pool } => {
            let table = load_parameters(&file)?;
            let session = connect(global)?;
            let pool = ScenarioPool::new(&session, pool)?;
            let ids = pool.apply(&table)?;
            info!(scenarios = ids.len(), "parameters applied");
        }
        MycCommand::Collect {
            ids,
            all,
            keys,
            gqueries,
            output,
            pool,
        } => {
            let session = connect(global)?;
            let pool = ScenarioPool::new(&session, pool)?;
            let table = match &gqueries {
                Some(gqueries) => pool.collect_gqueries(&ids, gqueries)?,
                None => pool.collect(&ids, all, keys.as_deref())?,
            };
            match output {
                Some(path) => save_parameters(&path, &table)?,
                None => write_parameters(std::io::stdout().lock(), &table)?,
            }
        }
        MycCommand::Curves {
            ids,
            carrier,
            dir,
            xlsx,
            pool,
        } => {
            std::fs::create_dir_all(&dir)
                .map_err(|e| AppError::new(2, format!("Failed to create '{}': {e}", dir.display())))?;
            let session = connect(global)?;
            let pool = ScenarioPool::new(&session, pool)?;
            let sets = pool.carrier_curves(&ids, carrier)?;
            let extension = if xlsx { "xlsx" } else { "csv" };
            for (id, curves) in ids.iter().zip(&sets) {
                let path = dir.join(format!("{id}_{}.{extension}", carrier.endpoint()));
                save_curves(&path, curves)?;
                info!(path = %path.display(), columns = curves.n_columns(), "wrote curves");
            }
        }
        MycCommand::Url { ids, path, params } => {
            let config = engine_config(global)?;
            let params = params
                .iter()
                .map(|raw| split_pair(raw))
                .collect::<Result<Vec<_>, _>>()?;
            println!("{}", make_myc_url(&config.myc_url()?, &ids, path.as_deref(), &params)?);
        }
    }
    Ok(())
}

fn engine_config(global: &GlobalArgs) -> Result<EngineConfig, AppError> {
    Ok(EngineConfig::from_env()?.with_overrides(global.engine_url.clone(), global.token.clone())?)
}

fn connect(global: &GlobalArgs) -> Result<EngineSession, AppError> {
    Ok(EngineSession::new(engine_config(global)?)?)
}

/// Print or export a curve set according to the output options.
fn emit_curves(curves: &CurveSet, out: &OutputArgs) -> Result<(), AppError> {
    if out.summary {
        print!("{}", report::format_curve_summary(curves));
    }
    match &out.output {
        Some(path) => {
            save_curves(path, curves)?;
            info!(path = %path.display(), columns = curves.n_columns(), "wrote curves");
        }
        None if !out.summary => {
            let mut stdout = std::io::stdout().lock();
            write_curves(&mut stdout, curves)?;
            stdout
                .flush()
                .map_err(|e| AppError::new(2, format!("Failed to write to stdout: {e}")))?;
        }
        None => {}
    }
    Ok(())
}

/// The column of a parameter CSV named after `id`.
fn parameter_column(path: &Path, id: ScenarioId) -> Result<Vec<(String, f64)>, AppError> {
    let table = load_parameters(path)?;
    let name = id.to_string();
    let column = table
        .scenarios()
        .iter()
        .position(|s| *s == name)
        .ok_or_else(|| AppError::new(2, format!("'{}' has no column for scenario {id}.", path.display())))?;
    Ok(table.scenario_values(column))
}

fn metadata_from(settings: &ScenarioSettings) -> Result<Option<Map<String, Value>>, AppError> {
    if settings.metadata.is_empty() {
        return Ok(None);
    }
    let mut metadata = Map::new();
    for raw in &settings.metadata {
        let (key, value) = split_pair(raw)?;
        // Numbers, booleans and JSON literals keep their type.
        let value = serde_json::from_str(&value).unwrap_or(Value::String(value));
        metadata.insert(key, value);
    }
    Ok(Some(metadata))
}

fn split_pair(raw: &str) -> Result<(String, String), AppError> {
    match raw.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => Ok((key.trim().to_string(), value.trim().to_string())),
        _ => Err(AppError::new(2, format!("Expected KEY=VALUE, got '{raw}'."))),
    }
}
