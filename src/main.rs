use clap::Parser;
use color_eyre::Result;
use daybook::{
    Config, Database, JournalStore, Profile, TaskStore,
    cli::{self, Cli, Commands},
    logging,
};
use std::path::Path;
use std::sync::Arc;

fn main() -> Result<()> {
    // Set up error reporting with color-eyre
    color_eyre::install()?;

    let cli = Cli::parse();

    // Logging comes up before the config so config failures are recorded
    let log_filter = logging::init();

    // Determine profile: --dev flag enables dev mode, otherwise use prod
    let profile = if cli.dev { Profile::Dev } else { Profile::Prod };

    let config = match &cli.config {
        Some(path) => Config::load_from_path(Path::new(path))?,
        None => Config::load_with_profile(profile)?,
    };

    log_filter.apply_config(&config.log_filter);

    let db_path = config.get_database_path();
    let db = Database::new(
        db_path
            .to_str()
            .ok_or_else(|| color_eyre::eyre::eyre!("Database path contains invalid UTF-8"))?,
    )?;
    let backend = Arc::new(db);
    let mut out = std::io::stdout().lock();

    let open_tasks = || {
        let mut store =
            TaskStore::new(backend.clone()).seed_on_first_run(config.seed_on_first_run);
        store.load();
        store
    };

    // Dispatch to appropriate command handler. Each store flushes its
    // pending writes when dropped at the end of its arm.
    match cli.command.unwrap_or(Commands::List) {
        Commands::List => cli::handle_list(&open_tasks(), &mut out)?,
        Commands::Add { title, due } => cli::handle_add(title, due, &mut open_tasks(), &mut out)?,
        Commands::Delete { id } => cli::handle_delete(id, &mut open_tasks(), &mut out)?,
        Commands::Rename { id, title } => {
            cli::handle_rename(id, title, &mut open_tasks(), &mut out)?
        }
        Commands::Due { id, date } => cli::handle_due(id, date, &mut open_tasks(), &mut out)?,
        Commands::Edit {
            id,
            title,
            subtasks,
        } => cli::handle_edit(id, title, subtasks, &mut open_tasks(), &mut out)?,
        Commands::Subtask { command } => {
            cli::handle_subtask(command, &mut open_tasks(), &mut out)?
        }
        Commands::Stats => cli::handle_stats(&open_tasks(), &mut out)?,
        Commands::Journal { command } => {
            let mut journal = JournalStore::new(backend.clone())
                .with_section_format(config.journal_date_format.clone());
            journal.load();
            cli::handle_journal(command, &mut journal, &mut out)?;
        }
    }

    Ok(())
}
