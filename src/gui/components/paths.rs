//! Settings panel: the five configured paths with validity indicators

use egui::{Color32, RichText};

use crate::config::Settings;
use crate::constants::gui::{COLOR_ERROR, COLOR_SUCCESS};
use crate::gui::state::{PathField, SharedState};

/// What the caller should do after rendering the panel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathsAction {
    None,
    Browse(PathField),
    Save,
}

fn validity_indicator(ui: &mut egui::Ui, field: PathField, settings: &Settings) {
    let (icon, color, hover) = if field.is_valid(settings) {
        ("✔", COLOR_SUCCESS, "Path exists")
    } else {
        ("✘", COLOR_ERROR, "Path not found")
    };
    ui.label(RichText::new(icon).color(color)).on_hover_text(hover);
}

pub fn ui(ui: &mut egui::Ui, state: &mut SharedState) -> PathsAction {
    let mut action = PathsAction::None;

    egui::Grid::new("paths_grid")
        .num_columns(4)
        .spacing([8.0, 6.0])
        .show(ui, |ui| {
            for &field in PathField::ALL {
                ui.label(field.label());

                let response = ui.add(
                    egui::TextEdit::singleline(field.get_mut(&mut state.settings))
                        .desired_width(420.0),
                );
                if response.changed() {
                    state.paths_dirty = true;
                }

                validity_indicator(ui, field, &state.settings);

                if ui.button("Browse...").clicked() {
                    action = PathsAction::Browse(field);
                }
                ui.end_row();
            }
        });

    ui.add_space(4.0);
    ui.horizontal(|ui| {
        let save = egui::Button::new("Save settings");
        if ui.add_enabled(state.paths_dirty, save).clicked() {
            action = PathsAction::Save;
        }
        if state.paths_dirty {
            ui.label(RichText::new("Unsaved changes").color(Color32::GRAY));
        }
    });

    action
}
