use lineboard_core::reconcile::ItemChange;
use lineboard_core::sync::{BoardObserver, BoardView};
use lineboard_core::{Banner, StatusItem, SyncLabel};
use std::io::Write;
use tracing::warn;

/// Line-oriented renderer for non-interactive output.
///
/// Each structural change becomes one line keyed by id, so the output can be
/// tailed or piped.
pub struct PlainObserver<W> {
    out: W,
    last_label: SyncLabel,
    last_banner: Banner,
}

impl<W: Write> PlainObserver<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            last_label: SyncLabel::Pending,
            last_banner: Banner::Hidden,
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn write_lines(&mut self, view: &BoardView, changes: &[ItemChange]) -> std::io::Result<()> {
        for change in changes {
            match change {
                ItemChange::Inserted { id, index } => {
                    if let Some(item) = find(view, id) {
                        writeln!(self.out, "+ [{index}] {}", describe(item))?;
                    }
                }
                ItemChange::Updated { id } => {
                    if let Some(item) = find(view, id) {
                        writeln!(self.out, "~ {}", describe(item))?;
                    }
                }
                ItemChange::Removed { id } => writeln!(self.out, "- {id}")?,
            }
        }
        if view.banner != self.last_banner {
            if let Some(message) = view.banner.message() {
                writeln!(self.out, "! {message}")?;
            }
            self.last_banner = view.banner;
        }
        if view.sync_label != self.last_label {
            writeln!(
                self.out,
                "@ {} ({} via {})",
                view.sync_label,
                view.connection,
                view.mode.as_str()
            )?;
            self.last_label = view.sync_label.clone();
        }
        self.out.flush()
    }
}

impl<W: Write> BoardObserver for PlainObserver<W> {
    fn board_changed(&mut self, view: &BoardView, changes: &[ItemChange]) {
        if let Err(err) = self.write_lines(view, changes) {
            warn!(event = "plain_write_error", error = %err);
        }
    }
}

fn find<'a>(view: &'a BoardView, id: &str) -> Option<&'a StatusItem> {
    view.items.iter().find(|item| item.id == id)
}

fn describe(item: &StatusItem) -> String {
    let marker = if item.severe { "!!" } else { "--" };
    if item.reason.is_empty() {
        format!("{} {marker} {} ({})", item.line_en, item.status_en, item.id)
    } else {
        format!(
            "{} {marker} {}: {} ({})",
            item.line_en, item.status_en, item.reason, item.id
        )
    }
}
