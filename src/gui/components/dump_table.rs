//! The dump table: one row per discovered dump with editable classification

use egui::RichText;

use crate::types::{AppArch, AppRole, DumpKind, FIELD_PLACEHOLDER};
use crate::gui::state::SharedState;

/// Row-level action picked up by the app after rendering
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableAction {
    None,
    Launch(usize),
    Remove(usize),
}

pub fn ui(ui: &mut egui::Ui, state: &mut SharedState) -> TableAction {
    let mut action = TableAction::None;

    if state.dumps.is_empty() {
        ui.label(RichText::new("No dumps loaded. Enter a case number and scan, or add a dump file.").weak());
        return action;
    }

    egui::Grid::new("dump_table")
        .num_columns(6)
        .striped(true)
        .spacing([10.0, 4.0])
        .show(ui, |ui| {
            ui.label(RichText::new("Dump file").strong());
            ui.label(RichText::new("Type").strong());
            ui.label(RichText::new("Architecture").strong());
            ui.label(RichText::new("Location").strong());
            ui.label("");
            ui.label("");
            ui.end_row();

            for index in 0..state.dumps.len() {
                let selected = state.selected_row == Some(index);
                let entry = &mut state.dumps[index];

                let label = ui
                    .selectable_label(selected, entry.file_name())
                    .on_hover_text(entry.path.display().to_string());
                if label.clicked() {
                    state.selected_row = Some(index);
                }

                let mut kind = entry.kind;
                egui::ComboBox::from_id_salt(("kind", index))
                    .selected_text(kind.label())
                    .show_ui(ui, |ui| {
                        for &option in DumpKind::ALL {
                            ui.selectable_value(&mut kind, option, option.label());
                        }
                    });
                if kind != entry.kind {
                    entry.set_kind(kind);
                }

                // Kernel dumps have no architecture or location to pick
                match entry.kind {
                    DumpKind::Kernel => {
                        ui.label(FIELD_PLACEHOLDER);
                        ui.label(FIELD_PLACEHOLDER);
                    }
                    DumpKind::User => {
                        egui::ComboBox::from_id_salt(("arch", index))
                            .selected_text(entry.arch_label())
                            .show_ui(ui, |ui| {
                                for &option in AppArch::ALL {
                                    ui.selectable_value(&mut entry.arch, Some(option), option.label());
                                }
                            });
                        egui::ComboBox::from_id_salt(("role", index))
                            .selected_text(entry.role_label())
                            .show_ui(ui, |ui| {
                                for &option in AppRole::ALL {
                                    ui.selectable_value(&mut entry.role, Some(option), option.label());
                                }
                            });
                    }
                }

                if ui.button("Launch").clicked() {
                    action = TableAction::Launch(index);
                }
                if ui.small_button("✖").on_hover_text("Remove from table").clicked() {
                    action = TableAction::Remove(index);
                }
                ui.end_row();
            }
        });

    action
}
