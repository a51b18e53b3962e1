//! Main window implemented with egui/eframe

use std::time::Duration;

use anyhow::{Result, anyhow};
use eframe::{NativeOptions, egui};
use tracing::info;

use super::components::{self, dump_table::TableAction, paths::PathsAction};
use crate::config::Settings;
use crate::constants::gui::*;
use crate::gui::state::{DialogPurpose, SharedState};

struct TriageApp {
    state: SharedState,
}

impl TriageApp {
    fn new(
        _cc: &eframe::CreationContext<'_>,
        settings: Settings,
        initial_case: Option<String>,
    ) -> Self {
        info!("Initializing egui window");
        let mut state = SharedState::new(settings);
        if let Some(case) = initial_case {
            state.case_number = case;
            state.start_scan(None);
        }
        Self { state }
    }

    fn case_bar(&mut self, ui: &mut egui::Ui) {
        let state = &mut self.state;
        ui.horizontal(|ui| {
            ui.label("Case number:");
            let response = ui.add(
                egui::TextEdit::singleline(&mut state.case_number).desired_width(120.0),
            );
            let submitted =
                response.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter));

            if (ui.button("Scan").clicked() || submitted) && !state.case_number.trim().is_empty() {
                state.start_scan(None);
            }
            if ui.button("Browse for case folder...").clicked() {
                state.open_folder_dialog(DialogPurpose::CaseFolder, "Select the case folder...");
            }
            if ui.button("Add dump file...").clicked() {
                state.open_dump_file_dialog();
            }
            if ui.button("Clear").clicked() {
                state.clear_table();
            }
        });

        ui.horizontal(|ui| {
            ui.label("Version:");
            let selected_label = if state.selected_version.is_empty() {
                "<none>"
            } else {
                state.selected_version.as_str()
            };
            egui::ComboBox::from_id_salt("version_select")
                .selected_text(selected_label)
                .show_ui(ui, |ui| {
                    for version in state.versions.clone() {
                        ui.selectable_value(
                            &mut state.selected_version,
                            version.clone(),
                            version,
                        );
                    }
                });
            if ui.button("⟳").on_hover_text("Re-read the version list").clicked() {
                state.refresh_versions();
            }
            ui.separator();
            let launch_selected = egui::Button::new("Launch selected");
            if ui
                .add_enabled(state.selected_row.is_some(), launch_selected)
                .clicked()
                && let Some(index) = state.selected_row
            {
                state.launch_entry(index, None);
            }
            let launch_all = egui::Button::new("Launch all");
            if ui.add_enabled(!state.dumps.is_empty(), launch_all).clicked() {
                state.launch_all();
            }
        });
    }
}

impl eframe::App for TriageApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.state.poll_jobs();

        egui::TopBottomPanel::top("case_bar").show(ctx, |ui| {
            ui.add_space(4.0);
            self.case_bar(ui);
            ui.add_space(4.0);
        });

        egui::TopBottomPanel::bottom("status_bar").show(ctx, |ui| {
            ui.horizontal(|ui| {
                if self.state.jobs_in_flight > 0 {
                    ui.spinner();
                    ui.label("Working...");
                }
                if let Some(message) = &self.state.status_message {
                    ui.colored_label(message.color, &message.text);
                }
            });
        });

        let mut table_action = TableAction::None;
        let mut paths_action = PathsAction::None;

        egui::CentralPanel::default().show(ctx, |ui| {
            egui::ScrollArea::vertical().show(ui, |ui| {
                table_action = components::dump_table::ui(ui, &mut self.state);

                ui.add_space(SECTION_SPACING);
                egui::CollapsingHeader::new("Paths")
                    .default_open(false)
                    .show(ui, |ui| {
                        paths_action = components::paths::ui(ui, &mut self.state);
                    });
            });
        });

        match table_action {
            TableAction::Launch(index) => self.state.launch_entry(index, None),
            TableAction::Remove(index) => self.state.remove_entry(index),
            TableAction::None => {}
        }

        match paths_action {
            PathsAction::Browse(field) => {
                let title = format!("Select the {}...", field.label().to_lowercase());
                self.state
                    .open_folder_dialog(DialogPurpose::PathSetting(field), &title);
            }
            PathsAction::Save => {
                self.state.save_settings();
                self.state.refresh_versions();
            }
            PathsAction::None => {}
        }

        // Keep polling while workers are out, otherwise repaint on input only
        if self.state.jobs_in_flight > 0 {
            ctx.request_repaint_after(Duration::from_millis(JOB_POLL_INTERVAL_MS));
        }
    }
}

pub fn run_gui(settings: Settings, initial_case: Option<String>) -> Result<()> {
    let options = NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([WINDOW_WIDTH, WINDOW_HEIGHT])
            .with_title(format!("Dump Triage - v{}", env!("CARGO_PKG_VERSION"))),
        ..Default::default()
    };

    eframe::run_native(
        &format!("Dump Triage - v{}", env!("CARGO_PKG_VERSION")),
        options,
        Box::new(|cc| Ok(Box::new(TriageApp::new(cc, settings, initial_case)))),
    )
    .map_err(|err| anyhow!("Failed to launch window: {err}"))
}
