//! Command implementations for tabdelta CLI

use crate::cli::{Commands, OutputFormat};
use crate::config::AppConfig;
use crate::dataset::UTF8_BOM;
use crate::error::{Result, TabdeltaError};
use crate::filter::{DateRangeFilter, KeywordFilter, SearchMode};
use crate::ingest::{read_table, RawTable};
use crate::normalize::NormalizationRequest;
use crate::output::{JsonFormatter, PrettyPrinter, StatusReport};
use crate::pipeline::{Pipeline, PipelineCapabilities};
use crate::request::ProcessRequest;
use crate::store::{SnapshotStore, WorkspaceStore, LATEST_POINTER};
use crate::transformer::Transformer;
use crate::workspace::TabdeltaWorkspace;
use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Execute a command
pub fn execute_command(command: Commands, workspace_path: Option<&Path>) -> Result<()> {
    execute_command_with(command, workspace_path, None)
}

/// Execute a command, using `transformer` instead of the configured one when given
pub fn execute_command_with(
    command: Commands,
    workspace_path: Option<&Path>,
    transformer: Option<Arc<dyn Transformer>>,
) -> Result<()> {
    match command {
        Commands::Init { force } => init_command(workspace_path, force),
        Commands::Process {
            latest,
            previous,
            from_store,
            date_filters,
            keyword_column,
            keywords,
            keywords_file,
            search_type,
            normalize_column,
            select,
            params,
            save_as,
            output,
            format,
            no_progress,
        } => {
            let options = ProcessOptions {
                latest,
                previous,
                from_store,
                date_filters,
                keyword_column,
                keywords,
                keywords_file,
                search_type,
                normalize_column,
                select,
                params,
                save_as,
                output,
                format,
                show_progress: !no_progress,
            };
            process_command(workspace_path, options, transformer)
        }
        Commands::Save { input, name } => save_command(workspace_path, &input, name.as_deref()),
        Commands::LoadPrevious { output } => load_previous_command(workspace_path, output.as_deref()),
        Commands::Status { format } => status_command(workspace_path, &format),
    }
}

/// Arguments of the `process` subcommand
struct ProcessOptions {
    latest: PathBuf,
    previous: Option<PathBuf>,
    from_store: bool,
    date_filters: Vec<DateRangeFilter>,
    keyword_column: Option<String>,
    keywords: Vec<String>,
    keywords_file: Option<PathBuf>,
    search_type: SearchMode,
    normalize_column: Option<String>,
    select: Option<String>,
    params: Option<PathBuf>,
    save_as: Option<String>,
    output: Option<PathBuf>,
    format: String,
    show_progress: bool,
}

/// Initialize tabdelta workspace
fn init_command(workspace_path: Option<&Path>, force: bool) -> Result<()> {
    let current_dir = std::env::current_dir()?;
    let root = workspace_path.unwrap_or(&current_dir);

    // Always create in the given directory, never in a parent workspace
    let workspace = if force {
        let workspace = TabdeltaWorkspace::from_root(root.to_path_buf());
        workspace.initialize(true)?;
        workspace
    } else {
        TabdeltaWorkspace::create_new(root.to_path_buf())?
    };

    println!("✅ Initialized tabdelta workspace at: {}", workspace.root.display());
    println!("📁 Workspace directory: {}", workspace.tabdelta_dir.display());

    Ok(())
}

/// Run the processing pipeline over the given exports
fn process_command(
    workspace_path: Option<&Path>,
    options: ProcessOptions,
    transformer: Option<Arc<dyn Transformer>>,
) -> Result<()> {
    let format = OutputFormat::parse(&options.format).map_err(TabdeltaError::invalid_input)?;
    let workspace = TabdeltaWorkspace::find_or_create(workspace_path)?;
    let config = AppConfig::load(&workspace.config_path())?;

    let request = build_request(&workspace, &options)?;

    let transformer = match transformer {
        Some(t) => Some(t),
        None => config.build_transformer()?,
    };
    match &transformer {
        Some(t) => log::debug!("AI steps use transformer '{}'", t.name()),
        None if request.normalization_column().is_some() || request.instruction().is_some() => {
            log::warn!("GEMINI_API_KEY is not set; AI steps will be skipped");
        }
        None => {}
    }

    let store: Arc<dyn SnapshotStore> = Arc::new(WorkspaceStore::for_workspace(&workspace));
    let pipeline = Pipeline::new(
        PipelineCapabilities {
            transformer,
            store: Some(store),
        },
        config.pipeline_settings(options.show_progress && format == OutputFormat::Pretty),
    );

    let latest = RawTable::from_path(&workspace.resolve_path(&options.latest))?;
    let previous = options
        .previous
        .as_ref()
        .map(|p| RawTable::from_path(&workspace.resolve_path(p)))
        .transpose()?;

    let outcome = pipeline.run(Some(latest), previous, &request);

    let output_path = options.output.as_ref().map(|p| workspace.resolve_path(p));
    if let (Some(path), Some(csv)) = (&output_path, &outcome.csv_data) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, csv)?;
    }

    match format {
        OutputFormat::Json => {
            println!("{}", JsonFormatter::format_outcome(&outcome, output_path.is_none())?);
        }
        OutputFormat::Pretty => {
            PrettyPrinter::print_outcome(&outcome);
            match (&output_path, &outcome.csv_data) {
                (Some(path), Some(_)) => println!("💾 Result written to: {}", path.display()),
                (None, Some(csv)) => {
                    println!();
                    print!("{}", csv.strip_prefix(UTF8_BOM).unwrap_or(csv));
                }
                _ => {}
            }
        }
    }

    if outcome.success {
        Ok(())
    } else {
        Err(TabdeltaError::ProcessingFailed(outcome.message))
    }
}

/// Merge the optional form-field document with command-line options
fn build_request(workspace: &TabdeltaWorkspace, options: &ProcessOptions) -> Result<ProcessRequest> {
    let mut request = match &options.params {
        Some(path) => {
            let content = fs::read_to_string(workspace.resolve_path(path))?;
            ProcessRequest::from_form_fields(&form_fields_from_json(&content)?)?
        }
        None => ProcessRequest::default(),
    };

    request.date_filters.extend(options.date_filters.iter().cloned());

    if let Some(column) = &options.keyword_column {
        let mut blob = options.keywords.join("\n");
        if let Some(path) = &options.keywords_file {
            blob.push('\n');
            blob.push_str(&fs::read_to_string(workspace.resolve_path(path))?);
        }
        request.keyword_filter = Some(KeywordFilter::from_blob(
            column.as_str(),
            &blob,
            options.search_type,
        ));
    }

    if let Some(column) = &options.normalize_column {
        request.normalization = Some(NormalizationRequest::enabled(column.as_str()));
    }
    if let Some(instruction) = &options.select {
        request.selection_instruction = Some(instruction.clone());
    }
    if options.from_store {
        request.previous_from_store = true;
    }
    if let Some(name) = &options.save_as {
        request.save_result = Some(name.clone());
    }

    Ok(request)
}

/// Flatten a JSON object into string form fields
fn form_fields_from_json(content: &str) -> Result<HashMap<String, String>> {
    let value: serde_json::Value = serde_json::from_str(content)?;
    let object = value
        .as_object()
        .ok_or_else(|| TabdeltaError::invalid_input("Parameter file must contain a JSON object"))?;

    Ok(object
        .iter()
        .filter_map(|(key, value)| {
            let text = match value {
                serde_json::Value::String(s) => s.clone(),
                serde_json::Value::Bool(b) => b.to_string(),
                serde_json::Value::Number(n) => n.to_string(),
                serde_json::Value::Array(items) => items
                    .iter()
                    .filter_map(|v| v.as_str())
                    .collect::<Vec<_>>()
                    .join("\n"),
                _ => return None,
            };
            Some((key.clone(), text))
        })
        .collect())
}

/// Store a table as the next previous snapshot
fn save_command(workspace_path: Option<&Path>, input: &Path, name: Option<&str>) -> Result<()> {
    let workspace = TabdeltaWorkspace::find_or_create(workspace_path)?;
    let input_path = workspace.resolve_path(input);

    let raw = RawTable::from_path(&input_path)?;
    let dataset = read_table(&raw.bytes)?;

    let name = match name {
        Some(n) => n.to_string(),
        None => input_path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .ok_or_else(|| TabdeltaError::invalid_input("Cannot derive a snapshot name; use --name"))?,
    };

    let store = WorkspaceStore::for_workspace(&workspace);
    let record = store.save_latest(&raw.bytes, &name)?;

    println!("✅ Snapshot saved successfully!");
    println!("├─ Name: {}", record.name);
    println!("├─ Rows: {}", dataset.len());
    println!("├─ Columns: {}", dataset.columns().len());
    println!("└─ Fingerprint: {}", record.fingerprint);

    Ok(())
}

/// Export the stored previous snapshot
fn load_previous_command(workspace_path: Option<&Path>, output: Option<&Path>) -> Result<()> {
    let workspace = TabdeltaWorkspace::find_or_create(workspace_path)?;
    let store = WorkspaceStore::for_workspace(&workspace);

    let snapshot = store
        .load_previous()?
        .ok_or_else(|| TabdeltaError::SnapshotNotFound {
            name: LATEST_POINTER.to_string(),
        })?;

    match output {
        Some(path) => {
            let path = workspace.resolve_path(path);
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(&path, &snapshot.bytes)?;
            println!(
                "✅ Exported snapshot '{}' to: {}",
                snapshot.record.name,
                path.display()
            );
        }
        None => {
            let mut stdout = std::io::stdout();
            stdout.write_all(&snapshot.bytes)?;
            stdout.flush()?;
        }
    }

    Ok(())
}

/// Show workspace status
fn status_command(workspace_path: Option<&Path>, format: &str) -> Result<()> {
    let format = OutputFormat::parse(format).map_err(TabdeltaError::invalid_input)?;
    let workspace = TabdeltaWorkspace::find_or_create(workspace_path)?;
    let config = AppConfig::load(&workspace.config_path())?;
    let store = WorkspaceStore::for_workspace(&workspace);

    let report = StatusReport::new(&workspace.root, &config, store.stats()?, store.list()?);

    match format {
        OutputFormat::Pretty => PrettyPrinter::print_status(&report),
        OutputFormat::Json => println!("{}", JsonFormatter::format(&report)?),
    }

    Ok(())
}
