use std::{
    fs,
    io::{stdin, stdout, Write},
    sync::Arc,
};

use chrono::{DateTime, Local};
use console::{style, Color, Style};
use log::{debug, info};
use tokio::sync::Mutex;

use crate::{
    parse_tags, Commands, Config, Confirm, EmptyTrash, NewNote, Note, NoteBoard, NoteColor,
    NotePatch, NoteRecord, NotebookCommands, Outcome, Result, TemplateCommands, Timestamp,
    ViewSelector,
};

/// Asks on the terminal with a `[y/N]` prompt.
pub struct StdinConfirm;

impl Confirm for StdinConfirm {
    fn confirm(&self, prompt: &str) -> bool {
        print!("{} [y/N]: ", prompt);
        if stdout().flush().is_err() {
            return false;
        }

        let mut input = String::new();
        if stdin().read_line(&mut input).is_err() {
            return false;
        }
        let input = input.trim().to_lowercase();
        input == "y" || input == "yes"
    }
}

/// Used when `--force` is given
struct AssumeYes;

impl Confirm for AssumeYes {
    fn confirm(&self, prompt: &str) -> bool {
        debug!("Auto-confirming: {}", prompt);
        true
    }
}

/// CLI Application handler - processes CLI commands and interfaces with the board
pub struct App {
    /// The note board
    board: Arc<Mutex<NoteBoard>>,

    /// Application configuration
    config: Config,

    /// Whether to display verbose output
    verbose: bool,
}

impl App {
    /// Create a new CLI application with the given board and config
    pub fn new(board: Arc<Mutex<NoteBoard>>, config: Config, verbose: bool) -> Self {
        Self {
            board,
            config,
            verbose,
        }
    }

    fn confirmer(force: bool) -> Box<dyn Confirm> {
        if force {
            Box::new(AssumeYes)
        } else {
            Box::new(StdinConfirm)
        }
    }

    /// Run the CLI application with the given command
    pub async fn run(&self, command: Commands) -> Result<()> {
        {
            let mut board = self.board.lock().await;
            for warning in board.take_warnings() {
                eprintln!("{} {}", style("warning:").yellow().bold(), warning);
            }
        }

        match command {
            Commands::Add {
                title,
                text,
                tags,
                notebook,
                template,
            } => self.add_note(title, text, tags, notebook, template).await?,

            Commands::List {
                archive,
                trash,
                notebook,
                search,
                json,
            } => self.list_notes(archive, trash, notebook, search, json).await?,

            Commands::Edit {
                id,
                title,
                text,
                tags,
                color,
            } => {
                let patch = NotePatch {
                    title,
                    text,
                    tags: tags.as_deref().map(parse_tags),
                    color,
                };
                self.edit_note(id, patch).await?
            }

            Commands::Pin { id } => {
                let pinned = self.board.lock().await.toggle_pin(id)?;
                println!("Note {} {}.", id, if pinned { "pinned" } else { "unpinned" });
            }

            Commands::Archive { id } => {
                self.board.lock().await.archive(id)?;
                println!("Note {} archived.", id);
            }

            Commands::Unarchive { id } => {
                self.board.lock().await.unarchive(id)?;
                println!("Note {} moved back to your notes.", id);
            }

            Commands::Trash { id, force } => {
                let confirm = Self::confirmer(force);
                match self.board.lock().await.trash(id, &*confirm)? {
                    Outcome::Applied => println!("Note {} moved to the trash.", id),
                    Outcome::Declined => println!("Cancelled."),
                }
            }

            Commands::Restore { id } => {
                self.board.lock().await.restore(id)?;
                println!("Note {} restored.", id);
            }

            Commands::Purge { id, force } => {
                let confirm = Self::confirmer(force);
                match self
                    .board
                    .lock()
                    .await
                    .delete_permanently(id, &*confirm)?
                {
                    Outcome::Applied => println!("Note {} has been permanently deleted.", id),
                    Outcome::Declined => println!("Deletion cancelled."),
                }
            }

            Commands::EmptyTrash { force } => {
                let confirm = Self::confirmer(force);
                match self.board.lock().await.empty_trash(&*confirm)? {
                    EmptyTrash::Emptied(count) => {
                        println!("Permanently deleted {} note{}.", count, plural(count))
                    }
                    EmptyTrash::AlreadyEmpty => println!("The trash is empty."),
                    EmptyTrash::Declined => println!("Cancelled."),
                }
            }

            Commands::Reorder { ids } => {
                self.board.lock().await.reorder(&ids)?;
                println!("Order saved.");
            }

            Commands::Move { id, notebook } => {
                let changed = self
                    .board
                    .lock()
                    .await
                    .assign_notebook(id, notebook.as_deref())?;
                match (changed, notebook) {
                    (false, _) => println!("Nothing to change."),
                    (true, Some(name)) => println!("Note {} filed in \"{}\".", id, name),
                    (true, None) => println!("Note {} removed from its notebook.", id),
                }
            }

            Commands::Notebook { command } => self.handle_notebook(command).await?,

            Commands::Template { command } => self.handle_template(command).await?,

            Commands::Export { output } => {
                let json = self.board.lock().await.export_json()?;
                fs::write(&output, json)?;
                println!("Exported to {}", output.display());
            }

            Commands::Import { source, force } => {
                let content = fs::read_to_string(&source)?;
                let confirm = Self::confirmer(force);
                match self
                    .board
                    .lock()
                    .await
                    .import_json(&content, &*confirm)?
                {
                    Outcome::Applied => println!("Imported {}", source.display()),
                    Outcome::Declined => println!("Import cancelled."),
                }
            }

            Commands::Config => {
                println!("{}", serde_json::to_string_pretty(&self.config)?);
            }
        }

        Ok(())
    }

    async fn add_note(
        &self,
        title: String,
        text: String,
        tags: Option<String>,
        notebook: Option<String>,
        template: Option<String>,
    ) -> Result<()> {
        let mut board = self.board.lock().await;

        let mut draft = match template {
            Some(name) => board.draft_from_template(&name)?,
            None => NewNote::default(),
        };

        // Explicit values win over the template
        if !title.is_empty() {
            draft.title = title;
        }
        if !text.is_empty() {
            draft.text = text;
        }
        if let Some(tags) = tags {
            draft.tags = parse_tags(&tags);
        }
        draft.notebook = notebook;

        let id = board.add_note(draft)?;
        println!("Note created with ID: {}", id);
        Ok(())
    }

    async fn edit_note(&self, id: i64, patch: NotePatch) -> Result<()> {
        if patch.is_empty() {
            println!("Nothing to change.");
            return Ok(());
        }

        let mut board = self.board.lock().await;
        let token = board.begin_edit(id)?;
        match board.save_edit(token, &patch) {
            Ok(true) => println!("Note {} updated.", id),
            Ok(false) => println!("Note {} already up to date.", id),
            Err(e) => {
                board.cancel_edit(token)?;
                return Err(e);
            }
        }
        Ok(())
    }

    async fn list_notes(
        &self,
        archive: bool,
        trash: bool,
        notebook: Option<String>,
        search: Option<String>,
        json: bool,
    ) -> Result<()> {
        let mut board = self.board.lock().await;

        let view = if trash {
            ViewSelector::Trash
        } else if archive {
            ViewSelector::Archive
        } else {
            match notebook {
                Some(name) => ViewSelector::notebook(board.notebook_id(&name)?),
                None => ViewSelector::ALL,
            }
        };
        board.set_view(view);
        board.set_search(search.as_deref().unwrap_or(""));

        let notes = board.visible_notes();
        info!("Listing {} notes", notes.len());

        if json {
            let records: Vec<NoteRecord> = notes.iter().map(|n| NoteRecord::from(*n)).collect();
            println!("{}", serde_json::to_string_pretty(&records)?);
            return Ok(());
        }

        if notes.is_empty() {
            println!("{}", empty_message(&view, !board.search().is_empty()));
            return Ok(());
        }

        self.display_notes_text(&notes, &view);
        println!("\n{} note{}", notes.len(), plural(notes.len()));
        Ok(())
    }

    /// Display notes in text format
    fn display_notes_text(&self, notes: &[&Note], view: &ViewSelector) {
        // Use terminal width for formatting if available
        let term_width = terminal_size::terminal_size()
            .map(|(w, _)| w.0 as usize)
            .unwrap_or(80);

        for (i, note) in notes.iter().enumerate() {
            if i > 0 {
                println!("{}", "-".repeat(term_width.min(50)));
            }

            let marker = if note.status.is_pinned() { "* " } else { "" };
            let title_style = color_style(note.color).bold();
            println!(
                "{}{} {}",
                marker,
                title_style.apply_to(note.display_title()),
                style(format!("[{}]", note.id)).dim()
            );

            let preview = content_preview(&note.text, term_width.saturating_sub(4).max(20));
            if !preview.is_empty() {
                println!("  {}", preview);
            }

            if !note.tags.is_empty() {
                let tags = note
                    .tags
                    .iter()
                    .map(|tag| format!("#{}", tag))
                    .collect::<Vec<_>>()
                    .join(" ");
                println!("  {}", style(tags).cyan());
            }

            println!("  {}", style(timestamp_line(note, view)).dim());
        }

        if self.verbose {
            debug!("Rendered {} notes at width {}", notes.len(), term_width);
        }
    }

    async fn handle_notebook(&self, command: NotebookCommands) -> Result<()> {
        let mut board = self.board.lock().await;
        match command {
            NotebookCommands::Add { name } => {
                let notebook = board.add_notebook(&name)?;
                println!("Notebook \"{}\" created.", notebook.name);
            }
            NotebookCommands::List => {
                if board.notebooks().is_empty() {
                    println!("No notebooks yet.");
                }
                for notebook in board.notebooks() {
                    let count = board
                        .notes()
                        .iter()
                        .filter(|n| n.status.is_active() && n.notebook_id == Some(notebook.id))
                        .count();
                    println!("{} ({})", style(&notebook.name).bold(), count);
                }
            }
        }
        Ok(())
    }

    async fn handle_template(&self, command: TemplateCommands) -> Result<()> {
        let mut board = self.board.lock().await;
        match command {
            TemplateCommands::Save {
                name,
                title,
                text,
                tags,
            } => {
                let tags = tags.as_deref().map(parse_tags).unwrap_or_default();
                board.save_template(&name, &title, &text, tags)?;
                println!("Template \"{}\" saved.", name.trim());
            }
            TemplateCommands::List => {
                if board.templates().is_empty() {
                    println!("No templates yet.");
                }
                for template in board.templates() {
                    println!("{}: {}", style(&template.name).bold(), template.title);
                }
            }
            TemplateCommands::Remove { name } => {
                board.delete_template(&name)?;
                println!("Template \"{}\" deleted.", name);
            }
        }
        Ok(())
    }
}

fn plural(count: usize) -> &'static str {
    if count == 1 {
        ""
    } else {
        "s"
    }
}

fn color_style(color: Option<NoteColor>) -> Style {
    let fg = match color {
        None => return Style::new(),
        Some(NoteColor::Yellow) => Color::Yellow,
        Some(NoteColor::Blue) => Color::Blue,
        Some(NoteColor::Green) => Color::Green,
        Some(NoteColor::Red) => Color::Red,
        Some(NoteColor::Purple) => Color::Magenta,
        Some(NoteColor::Grey) => Color::Color256(8),
    };
    Style::new().fg(fg)
}

fn format_timestamp(millis: Timestamp) -> String {
    DateTime::from_timestamp_millis(millis)
        .map(|dt| dt.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| millis.to_string())
}

/// "Created ..." plus edit time when it is more than a minute later, and the
/// deletion time in the trash
fn timestamp_line(note: &Note, view: &ViewSelector) -> String {
    let mut line = format!("Created {}", format_timestamp(note.id));
    if note.last_modified > note.id.saturating_add(60_000) {
        line.push_str(&format!(", edited {}", format_timestamp(note.last_modified)));
    }
    if let (ViewSelector::Trash, Some(deleted_at)) = (view, note.status.deleted_at()) {
        line.push_str(&format!(", deleted {}", format_timestamp(deleted_at)));
    }
    line
}

/// First non-empty line, cut to `max_chars`
fn content_preview(content: &str, max_chars: usize) -> String {
    let first_line = content
        .lines()
        .find(|line| !line.trim().is_empty())
        .unwrap_or("")
        .trim();

    if first_line.chars().count() <= max_chars {
        first_line.to_string()
    } else {
        let cut: String = first_line.chars().take(max_chars).collect();
        format!("{}...", cut)
    }
}

fn empty_message(view: &ViewSelector, searching: bool) -> &'static str {
    match (view, searching) {
        (ViewSelector::Trash, false) => "The trash is empty.",
        (ViewSelector::Trash, true) => "No notes in the trash match.",
        (ViewSelector::Archive, false) => "The archive is empty.",
        (ViewSelector::Archive, true) => "No archived notes match.",
        (ViewSelector::Active { notebook: Some(_) }, false) => "This notebook is empty.",
        (ViewSelector::Active { notebook: Some(_) }, true) => "No notes in this notebook match.",
        (ViewSelector::Active { notebook: None }, false) => {
            "No notes yet. Use `startnotes add` to create one."
        }
        (ViewSelector::Active { notebook: None }, true) => "No notes match.",
    }
}
