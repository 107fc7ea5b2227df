//! `papernest` command-line entry point.
//!
//! # Responsibility
//! - Resolve configuration, start logging and open the project store.
//! - Map each subcommand onto one core operation and print its outcome.

mod config;

use anyhow::{Context, Result};
use clap::Parser;
use config::{Cli, Command, GroupCommand, PaperCommand};
use log::info;
use papernest_core::{
    export_project, import_project, init_logging, new_project, open_db, Connection, GroupId,
    OrderingService, Paper, PaperService, SqliteGroupRepository, SqlitePaperRepository,
};

type Ordering<'conn> = OrderingService<SqliteGroupRepository<'conn>, SqlitePaperRepository<'conn>>;

fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Some(log_dir) = cli.log_dir().context("failed to resolve log directory")? {
        init_logging(&cli.log_level(), &log_dir)
            .with_context(|| format!("failed to start logging in {}", log_dir.display()))?;
    }

    let db_path = cli.db_path();
    let conn = open_db(&db_path)
        .with_context(|| format!("failed to open project store at {}", db_path.display()))?;
    info!(
        "event=cli_command module=cli status=start command={}",
        command_name(&cli.cmd)
    );
    run(&conn, cli.cmd)
}

fn run(conn: &Connection, cmd: Command) -> Result<()> {
    match cmd {
        Command::New { title } => {
            let workspace = new_project(conn, &title)?;
            println!("new project {}", workspace.id);
        }
        Command::Export { path } => {
            let summary = export_project(conn, &path)?;
            println!(
                "exported {} groups and {} papers to {} ({} bytes)",
                summary.counts.paper_groups,
                summary.counts.papers,
                summary.path.display(),
                summary.bytes_written
            );
        }
        Command::Import { path } => {
            let report = import_project(conn, &path)
                .with_context(|| format!("failed to import {}", path.display()))?;
            for warning in &report.warnings {
                eprintln!("warning: {warning}");
            }
            println!(
                "imported {} groups and {} papers",
                report.counts.paper_groups, report.counts.papers
            );
        }
        Command::Tree => print_tree(conn)?,
        Command::Group(cmd) => run_group(conn, cmd)?,
        Command::Paper(cmd) => run_paper(conn, cmd)?,
    }
    Ok(())
}

fn ordering(conn: &Connection) -> Result<Ordering<'_>> {
    Ok(OrderingService::new(
        SqliteGroupRepository::try_new(conn)?,
        SqlitePaperRepository::try_new(conn)?,
    ))
}

fn run_group(conn: &Connection, cmd: GroupCommand) -> Result<()> {
    let ordering = ordering(conn)?;
    match cmd {
        GroupCommand::Create { name, parent } => {
            let group = match parent {
                Some(parent_id) => ordering.create_subgroup(parent_id, name)?,
                None => ordering.create_root_group(name)?,
            };
            println!("{}", group.id);
        }
        GroupCommand::Delete { id } => {
            let outcome = ordering.delete_group(id)?;
            println!(
                "deleted {id}; moved {} papers and {} subgroups",
                outcome.reparented_papers,
                outcome.promoted_subgroups.len()
            );
        }
        GroupCommand::Rename { id, name } => ordering.rename_group(id, name)?,
        GroupCommand::Move(args) => ordering.move_group(args.id, args.before)?,
        GroupCommand::Toggle { id } => {
            let collapsed = ordering.toggle_collapsed(id)?;
            println!("{}", if collapsed { "collapsed" } else { "expanded" });
        }
    }
    Ok(())
}

fn run_paper(conn: &Connection, cmd: PaperCommand) -> Result<()> {
    match cmd {
        PaperCommand::Add { title, group, url } => {
            let papers = PaperService::new(
                SqlitePaperRepository::try_new(conn)?,
                SqliteGroupRepository::try_new(conn)?,
            );
            let mut paper = Paper::new(title.trim());
            paper.group_id = group;
            paper.source_url = url.unwrap_or_default();
            let stored = papers.create_paper(paper)?;
            println!("{}", stored.id);
        }
        PaperCommand::Move(args) => {
            ordering(conn)?.move_paper(args.id, args.group, args.before)?;
        }
        PaperCommand::Delete { id } => {
            let papers = PaperService::new(
                SqlitePaperRepository::try_new(conn)?,
                SqliteGroupRepository::try_new(conn)?,
            );
            papers.delete_paper(id)?;
        }
    }
    Ok(())
}

fn print_tree(conn: &Connection) -> Result<()> {
    let ordering = ordering(conn)?;
    for node in ordering.group_tree()? {
        let root = &node.group;
        print_group(&ordering, 0, &root.name, root.id, root.is_collapsed)?;
        if root.is_collapsed {
            continue;
        }
        for sub in &node.subgroups {
            print_group(&ordering, 1, &sub.name, sub.id, sub.is_collapsed)?;
        }
    }
    for paper in ordering.list_papers(None)? {
        println!("- {} [{}]", paper.display_title(), paper.id);
    }
    Ok(())
}

fn print_group(
    ordering: &Ordering<'_>,
    depth: usize,
    name: &str,
    id: GroupId,
    collapsed: bool,
) -> Result<()> {
    let indent = "  ".repeat(depth);
    let marker = if collapsed { "+" } else { "-" };
    println!("{indent}{marker} {name}/ [{id}]");
    if collapsed {
        return Ok(());
    }
    for paper in ordering.list_papers(Some(id))? {
        println!("{indent}    {} [{}]", paper.display_title(), paper.id);
    }
    Ok(())
}

fn command_name(cmd: &Command) -> &'static str {
    match cmd {
        Command::New { .. } => "new",
        Command::Export { .. } => "export",
        Command::Import { .. } => "import",
        Command::Tree => "tree",
        Command::Group(_) => "group",
        Command::Paper(_) => "paper",
    }
}
