use std::io::{self, Write};

use chrono::NaiveDate;
use gantt_planner::diagnostics::{self, LogBuffer};
use gantt_planner::persistence::{
    JsonPlanStore, PlanStore, export_csv_file, import_csv_file, load_plan_from_json,
    save_plan_to_json,
};
use gantt_planner::sync::{self, JsonFileSource, TaskSource};
use gantt_planner::table::{overview_frame, render_frame_as_text, render_timeline_text, tasks_frame};
use gantt_planner::{
    Granularity, MergeMode, NewTask, PlannerConfig, TaskKind, TaskStore, calendar, timeline,
};

struct Session {
    store: TaskStore,
    config: PlannerConfig,
    logs: LogBuffer,
    today: NaiveDate,
}

impl Session {
    fn show(&self, resource: Option<&str>, kind: Option<&TaskKind>) {
        let tasks = self.store.filtered(resource, kind);
        match tasks_frame(&tasks) {
            Ok(df) => println!("{}", render_frame_as_text(&df)),
            Err(e) => println!("Error: {e}"),
        }
    }

    fn show_all(&self) {
        self.show(None, None);
    }

    fn kind_arg(&self, arg: &str) -> TaskKind {
        if arg == "-" {
            self.config.default_kind.clone()
        } else {
            TaskKind::parse(arg)
        }
    }

    fn persist(&self) {
        if let Some(path) = &self.config.store_path {
            if let Err(e) = JsonPlanStore::new(path).save_plan(&self.store) {
                tracing::warn!(category = "STORE", error = %e, "could not save plan");
            }
        }
    }
}

fn parse_mode(arg: Option<&str>) -> Result<MergeMode, String> {
    arg.map(|m| m.parse::<MergeMode>().map_err(|e| e.to_string()))
        .transpose()
        .map(Option::unwrap_or_default)
}

fn rest_of_line<'a>(parts: impl Iterator<Item = &'a str>) -> String {
    parts.collect::<Vec<_>>().join(" ")
}

fn print_help() {
    println!(
        "Commands:\n  help                                      Show this help\n  show [resource|-] [type]                  Show tasks, optionally filtered\n  resources                                 Per-resource overview and next free slot\n  slot [resource]                           Next free slot for a resource\n  add <resource> <days> <type|-> <name...>  Append a task at the next free slot\n  insert <after_id> <days> <type|-> <name...>\n                                            Insert after a task, shifting later ones\n  alloc <pct>                               Recalculate durations at an allocation %\n  import <path> [replace|append]            Import tasks from CSV\n  export <path>                             Export tasks to CSV\n  save json <path>                          Save the plan as JSON\n  load json <path>                          Load a plan from JSON\n  sync <path> [replace|append]              Sync from a JSON file of source records\n  timeline [granularity] [week YYYY-MM-DD]  Show the chart range and headers\n  today [YYYY-MM-DD]                        Show or pin the planning date\n  logs [json|clear]                         Show recorded diagnostics\n  quit|exit                                 Exit"
    );
}

fn main() {
    let logs = LogBuffer::new();
    if let Err(e) = diagnostics::init_tracing("warn", Some(logs.clone())) {
        eprintln!("logging disabled: {e}");
    }

    let config = match PlannerConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Invalid configuration: {e}");
            PlannerConfig::default()
        }
    };

    let loaded = config
        .store_path
        .as_ref()
        .map(|path| JsonPlanStore::new(path).load_plan());
    let store = match loaded {
        Some(Ok(Some(store))) => store,
        Some(Err(e)) => {
            eprintln!("Could not load saved plan: {e}");
            TaskStore::new()
        }
        _ => TaskStore::from_parts(Vec::new(), config.allocation_percentage).unwrap_or_default(),
    };

    let mut session = Session {
        store,
        config,
        logs,
        today: calendar::today(),
    };

    println!("Gantt Planner (CLI) - type 'help' for commands\n");
    session.show_all();

    let stdin = io::stdin();
    let mut line = String::new();
    loop {
        print!("> ");
        let _ = io::stdout().flush();
        line.clear();
        match stdin.read_line(&mut line) {
            Ok(0) | Err(_) => break,
            Ok(_) => {}
        }
        let input = line.trim();
        if input.is_empty() {
            continue;
        }

        let mut parts = input.split_whitespace();
        let cmd = parts.next().unwrap_or("");

        match cmd {
            "help" => print_help(),
            "quit" | "exit" => break,
            "show" => {
                let resource = parts.next().filter(|r| *r != "-");
                let kind = parts.next().map(TaskKind::parse);
                session.show(resource, kind.as_ref());
            }
            "resources" => {
                let overview = session.store.overview(session.today);
                match overview_frame(&overview) {
                    Ok(df) => println!("{}", render_frame_as_text(&df)),
                    Err(e) => println!("Error: {e}"),
                }
            }
            "slot" => {
                let resource = parts
                    .next()
                    .map(str::to_string)
                    .or_else(|| session.config.default_resource.clone());
                match resource {
                    Some(resource) => {
                        let slot = session.store.slot(&resource, session.today);
                        match slot.after_task_id {
                            Some(id) => println!("Next slot for {resource}: {} (after task {id})", slot.date),
                            None => println!("Next slot for {resource}: {}", slot.date),
                        }
                    }
                    None => println!("Usage: slot <resource>"),
                }
            }
            "add" => {
                let (Some(resource), Some(days), Some(kind)) = (parts.next(), parts.next(), parts.next()) else {
                    println!("Usage: add <resource> <days> <type|-> <name...>");
                    continue;
                };
                let duration: i64 = match days.parse() {
                    Ok(v) => v,
                    Err(_) => {
                        println!("Invalid duration");
                        continue;
                    }
                };
                let spec = NewTask::new(rest_of_line(parts), resource, duration)
                    .with_kind(session.kind_arg(kind));
                match session.store.insert(&spec, session.today) {
                    Ok(updated) => {
                        session.store = updated;
                        if let Some(task) = session.store.tasks().last() {
                            println!("Added task {} starting {}.", task.id, task.start_date);
                            tracing::info!(category = "TASKS", task_id = task.id, "task added");
                        }
                        session.persist();
                        session.show_all();
                    }
                    Err(e) => println!("Error: {e}"),
                }
            }
            "insert" => {
                let (Some(after), Some(days), Some(kind)) = (parts.next(), parts.next(), parts.next()) else {
                    println!("Usage: insert <after_id> <days> <type|-> <name...>");
                    continue;
                };
                let (Ok(after), Ok(duration)) = (after.parse::<i32>(), days.parse::<i64>()) else {
                    println!("Invalid task id or duration");
                    continue;
                };
                let Some(resource) = session.store.find_task(after).map(|t| t.resource.clone()) else {
                    println!("Error: task {after} not found");
                    continue;
                };
                let spec = NewTask::new(rest_of_line(parts), resource, duration)
                    .with_kind(session.kind_arg(kind))
                    .after(after);
                match session.store.insert(&spec, session.today) {
                    Ok(updated) => {
                        session.store = updated;
                        if let Some(task) = session.store.tasks().last() {
                            println!("Inserted task {} after {after}, starting {}.", task.id, task.start_date);
                            tracing::info!(category = "TASKS", task_id = task.id, after, "task inserted");
                        }
                        session.persist();
                        session.show_all();
                    }
                    Err(e) => println!("Error: {e}"),
                }
            }
            "alloc" => {
                let Some(pct) = parts.next().and_then(|p| p.trim_end_matches('%').parse::<u32>().ok()) else {
                    println!("Usage: alloc <pct>");
                    continue;
                };
                match session.store.with_allocation(pct) {
                    Ok(updated) => {
                        session.store = updated;
                        println!("Allocation set to {pct}%.");
                        session.persist();
                        session.show_all();
                    }
                    Err(e) => println!("Error: {e}"),
                }
            }
            "import" => {
                let Some(path) = parts.next() else {
                    println!("Usage: import <path> [replace|append]");
                    continue;
                };
                let mode = match parse_mode(parts.next()) {
                    Ok(mode) => mode,
                    Err(e) => {
                        println!("Error: {e}");
                        continue;
                    }
                };
                match import_csv_file(path, &session.store, mode, session.today) {
                    Ok(updated) => {
                        session.store = updated;
                        println!("Imported from {path} ({mode}); {} tasks.", session.store.len());
                        tracing::info!(category = "CSV", %mode, path, "csv imported");
                        session.persist();
                        session.show_all();
                    }
                    Err(e) => {
                        tracing::warn!(category = "CSV", error = %e, "csv import failed");
                        println!("Error: {e}");
                    }
                }
            }
            "export" => {
                let Some(path) = parts.next() else {
                    println!("Usage: export <path>");
                    continue;
                };
                match export_csv_file(session.store.tasks(), path) {
                    Ok(()) => println!("Exported {} tasks to {path}.", session.store.len()),
                    Err(e) => println!("Error: {e}"),
                }
            }
            "save" | "load" => {
                let (Some("json"), Some(path)) = (parts.next(), parts.next()) else {
                    println!("Usage: {cmd} json <path>");
                    continue;
                };
                if cmd == "save" {
                    match save_plan_to_json(&session.store, path) {
                        Ok(()) => println!("Plan saved to {path}."),
                        Err(e) => println!("Error: {e}"),
                    }
                } else {
                    match load_plan_from_json(path) {
                        Ok(store) => {
                            session.store = store;
                            println!("Plan loaded from {path}.");
                            session.show_all();
                        }
                        Err(e) => println!("Error: {e}"),
                    }
                }
            }
            "sync" => {
                let Some(path) = parts.next() else {
                    println!("Usage: sync <path> [replace|append]");
                    continue;
                };
                let mode = match parse_mode(parts.next()) {
                    Ok(mode) => mode,
                    Err(e) => {
                        println!("Error: {e}");
                        continue;
                    }
                };
                if let Some(backend) = session.config.source.backend_label() {
                    tracing::info!(category = "SYNC", %backend, path, "mirroring source backend from file");
                }
                let filter = session.config.source.record_filter();
                let result = JsonFileSource::new(path)
                    .fetch()
                    .map(|records| filter.apply(records))
                    .and_then(|records| {
                        let incoming = sync::normalize_records(records, session.today)?;
                        Ok(sync::sync(&session.store, mode, incoming)?)
                    });
                match result {
                    Ok(updated) => {
                        session.store = updated;
                        println!("Synced from {path} ({mode}); {} tasks.", session.store.len());
                        session.persist();
                        session.show_all();
                    }
                    Err(e) => {
                        tracing::error!(category = "SYNC", error = %e, "sync failed");
                        println!("Error: {e}");
                    }
                }
            }
            "timeline" => {
                let mut granularity = session.config.granularity;
                let mut week = None;
                let mut invalid = None;
                while let Some(arg) = parts.next() {
                    if arg == "week" {
                        match parts.next().map(calendar::parse_date) {
                            Some(Ok(date)) => week = Some(date),
                            Some(Err(e)) => invalid = Some(e.to_string()),
                            None => invalid = Some("week needs a date".into()),
                        }
                    } else {
                        match arg.parse::<Granularity>() {
                            Ok(g) => granularity = g,
                            Err(e) => invalid = Some(e.to_string()),
                        }
                    }
                }
                if let Some(message) = invalid {
                    println!("Error: {message}");
                    continue;
                }
                let range = timeline::compute_range(session.store.tasks(), week, session.today);
                println!("{}", render_timeline_text(session.store.tasks(), &range, granularity));
            }
            "today" => match parts.next().map(calendar::parse_date) {
                Some(Ok(date)) => {
                    session.today = date;
                    println!("Planning date set to {date}.");
                }
                Some(Err(e)) => println!("Error: {e}"),
                None => println!("Planning date: {}", session.today),
            },
            "logs" => match parts.next() {
                Some("json") => match session.logs.export_json() {
                    Ok(json) => println!("{json}"),
                    Err(e) => println!("Error: {e}"),
                },
                Some("clear") => {
                    session.logs.clear();
                    println!("Logs cleared.");
                }
                _ => {
                    for entry in session.logs.entries() {
                        println!(
                            "[{}] [{}] [{}] {}",
                            entry.timestamp.format("%H:%M:%S"),
                            entry.level,
                            entry.category,
                            entry.message
                        );
                    }
                    println!("{}", session.logs.summary());
                }
            },
            _ => {
                println!("Unknown command. Type 'help'.");
            }
        }
    }
}
