use std::io::{self, Write};

use stucon::cascade::FilterController;
use stucon::catalog::{Catalog, CatalogProvider};
use stucon::selection::{Dimension, ALL};

/// Interactive walk-through of the cascading filter over the seed catalog.
/// Useful for poking at the cascade without a browser.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let provider = CatalogProvider::from_catalog(Catalog::seed());
    let mut controller = FilterController::new(provider);
    controller.initialize().await?;

    println!("Stucon document browser. Type 'help' for commands.");
    let mut status = String::from("ok");

    loop {
        print!("({status}) > ");
        io::stdout().flush()?;

        let mut line = String::new();
        if io::stdin().read_line(&mut line)? == 0 {
            break;
        }
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        if line == "help" {
            println!("Commands:");
            println!("  scheme|branch|semester|subject <value>: select a filter value");
            println!("  options <dimension>: show the current option set");
            println!("  list: show the documents matching the current filters");
            println!("  summary: show the current selection");
            println!("  clear: clear all filters");
            println!("  q: quit");
            continue;
        }
        if line == "q" {
            break;
        }

        status = match line.split_once(' ') {
            Some(("options", key)) => match Dimension::parse(key.trim()) {
                Some(dim) => {
                    let set = controller.options(dim);
                    if !set.enabled {
                        println!("({dim} is disabled)");
                    }
                    for choice in &set.choices {
                        println!("  {}", choice.display_text);
                    }
                    "ok".to_string()
                }
                None => "unknown dimension".to_string(),
            },
            Some((key, value)) => match Dimension::parse(key) {
                Some(dim) => select(&mut controller, dim, value.trim()).await,
                None => "invalid command".to_string(),
            },
            None => match line {
                "list" => {
                    let docs = controller.visible_documents();
                    println!("{} document(s):", docs.len());
                    for d in docs {
                        println!(
                            "  [{}] {} | {} / {} / sem {} / {}",
                            d.id, d.title, d.scheme, d.branch, d.semester, d.subject
                        );
                    }
                    "ok".to_string()
                }
                "summary" => {
                    for (dim, sel) in controller.selection_summary() {
                        println!("  {}: {} (id: {:?})", dim, sel.value, sel.id);
                    }
                    "ok".to_string()
                }
                "clear" => {
                    controller.clear_filters();
                    "ok".to_string()
                }
                _ => "invalid command".to_string(),
            },
        };
    }

    Ok(())
}

/// Resolve a typed value against the dimension's current option set (the id
/// comes from the chosen option, as it would from a dropdown) and apply it.
async fn select(
    controller: &mut FilterController<CatalogProvider>,
    dimension: Dimension,
    value: &str,
) -> String {
    let choice = controller
        .options(dimension)
        .choices
        .iter()
        .find(|c| c.value.eq_ignore_ascii_case(value) || c.display_text.eq_ignore_ascii_case(value))
        .cloned();

    let (value, id) = match choice {
        Some(c) => (c.value, c.id),
        None if value.eq_ignore_ascii_case(ALL) => (ALL.to_string(), None),
        None => return format!("no such {dimension} option"),
    };

    match controller
        .on_selection_change(dimension, &value, id.as_deref())
        .await
    {
        Ok(()) => "ok".to_string(),
        Err(e) => e.to_string(),
    }
}
