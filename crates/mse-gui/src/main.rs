use chrono::{DateTime, Local};
use eframe::{App, egui};
use mse_core::json::{VALUE, VALUE_TYPE, leaf_tag};
use mse_core::{
    DecodeOptions, EditError, EditSession, ExportError, Kind, Violation, pointer_from_segments,
};
use serde_json::{Map, Value as J};
use std::collections::HashMap;
use std::path::PathBuf;

#[derive(Default)]
struct State {
    path: Option<PathBuf>,
    session: Option<EditSession>,
    // Text being typed into INT/STR fields, keyed by VALUE pointer. Kept when
    // an edit is rejected so the user can fix it.
    drafts: HashMap<String, String>,
    violations: Vec<Violation>,
    backup_on_save: bool,
    last_backup_time: Option<DateTime<Local>>,
    status: String,
}

struct AppGui {
    state: State,
}

impl AppGui {
    fn new(_cc: &eframe::CreationContext<'_>) -> Self {
        Self {
            state: State {
                backup_on_save: true,
                status: "Open a settings file".into(),
                ..Default::default()
            },
        }
    }

    fn open_file(&mut self) {
        let Some(path) = rfd::FileDialog::new()
            .add_filter("Settings", &["dat"])
            .add_filter("All files", &["*"])
            .set_directory(".")
            .pick_file()
        else {
            return;
        };
        let data = match std::fs::read(&path) {
            Ok(d) => d,
            Err(e) => {
                self.state.status = format!("Load error: {}", e);
                return;
            }
        };
        let loaded = match &mut self.state.session {
            Some(session) => session.replace(&data),
            None => EditSession::load(&data, DecodeOptions::default())
                .map(|s| self.state.session = Some(s)),
        };
        match loaded {
            Ok(()) => {
                self.state.status = format!("Loaded {}", path.display());
                self.state.path = Some(path);
                self.state.drafts.clear();
                self.state.violations.clear();
            }
            Err(e) => self.state.status = format!("Invalid data format: {}", e),
        }
    }

    fn save_file(&mut self) {
        let Some(session) = &self.state.session else {
            return;
        };
        let bytes = match session.export() {
            Ok(b) => b,
            Err(ExportError::Rejected(v)) => {
                self.state.violations = v;
                self.state.status = "Please use correct value types".into();
                return;
            }
            Err(e) => {
                self.state.status = format!("Save error: {}", e);
                return;
            }
        };
        let mut dialog = rfd::FileDialog::new().set_file_name(mse_core::DEFAULT_EXPORT_NAME);
        if let Some(dir) = self.state.path.as_ref().and_then(|p| p.parent()) {
            dialog = dialog.set_directory(dir);
        }
        let Some(dest) = dialog.save_file() else {
            return;
        };
        if self.state.backup_on_save && dest.is_file() {
            match mse_core::backup::backup_file(&dest) {
                Ok(_) => self.state.last_backup_time = Some(Local::now()),
                Err(e) => {
                    self.state.status = format!("Backup error: {}", e);
                    return;
                }
            }
        }
        self.state.status = match std::fs::write(&dest, &bytes) {
            Ok(()) => {
                tracing::info!(path = %dest.display(), bytes = bytes.len(), "saved settings");
                format!("Saved {}", dest.display())
            }
            Err(e) => format!("Save error: {}", e),
        };
    }

    fn apply_edits(&mut self, edits: Vec<(String, J)>) {
        let Some(session) = &mut self.state.session else {
            return;
        };
        for (ptr, value) in edits {
            match session.apply_edit(&ptr, value) {
                Ok(()) => {
                    self.state.violations.clear();
                    self.state.status = format!("Edited {}", ptr);
                }
                Err(EditError::Rejected(v)) => {
                    self.state.violations = v;
                    self.state.status = format!("Edit rejected: {}", ptr);
                }
                Err(e) => self.state.status = e.to_string(),
            }
        }
    }
}

impl App for AppGui {
    fn update(&mut self, ctx: &egui::Context, _: &mut eframe::Frame) {
        egui::TopBottomPanel::top("top").show(ctx, |ui| {
            ui.horizontal(|ui| {
                if ui.button("Open…").clicked() {
                    self.open_file();
                }
                if ui
                    .add_enabled(self.state.session.is_some(), egui::Button::new("Save…"))
                    .clicked()
                {
                    self.save_file();
                }
                ui.separator();
                ui.checkbox(&mut self.state.backup_on_save, "Zip backup on save");
                if let Some(time) = self.state.last_backup_time {
                    ui.label(format!("Last backup: {}", time.format("%Y-%m-%d %H:%M:%S")));
                }
                ui.separator();
                ui.label(&self.state.status);
            });
        });

        if !self.state.violations.is_empty() {
            egui::TopBottomPanel::bottom("violations")
                .resizable(true)
                .default_height(120.0)
                .show(ctx, |ui| {
                    ui.heading(format!("Violations ({})", self.state.violations.len()));
                    egui::ScrollArea::vertical()
                        .id_source("violations_scroll")
                        .show(ui, |ui| {
                            for v in &self.state.violations {
                                ui.colored_label(egui::Color32::LIGHT_RED, v.to_string());
                            }
                        });
                });
        }

        let mut edits = Vec::new();
        egui::CentralPanel::default().show(ctx, |ui| {
            let Some(session) = &self.state.session else {
                ui.label("No file loaded");
                return;
            };
            let doc = session.reference();
            ui.horizontal(|ui| {
                ui.label(format!("version {}", doc.version));
                ui.label(format!("magic {:#010x}", doc.magic));
            });
            ui.separator();
            let Some(root) = session.tree().get("root").and_then(J::as_object) else {
                return;
            };
            egui::ScrollArea::vertical()
                .id_source("tree_scroll")
                .auto_shrink([false, false])
                .show(ui, |ui| {
                    let mut path = vec!["root".to_string()];
                    show_dict(ui, root, &mut path, &mut self.state.drafts, &mut edits);
                });
        });
        self.apply_edits(edits);
    }
}

fn show_dict(
    ui: &mut egui::Ui,
    map: &Map<String, J>,
    path: &mut Vec<String>,
    drafts: &mut HashMap<String, String>,
    edits: &mut Vec<(String, J)>,
) {
    for (key, node) in map {
        path.push(key.clone());
        let pointer = pointer_from_segments(path);
        match node.as_object() {
            Some(leaf) if leaf.contains_key(VALUE_TYPE) => {
                show_leaf(ui, key, leaf, &pointer, drafts, edits);
            }
            Some(child) => {
                egui::CollapsingHeader::new(key.as_str())
                    .id_source(&pointer)
                    .default_open(path.len() <= 2)
                    .show(ui, |ui| show_dict(ui, child, path, drafts, edits));
            }
            None => {
                ui.label(format!("{}: {}", key, node));
            }
        }
        path.pop();
    }
}

fn show_leaf(
    ui: &mut egui::Ui,
    key: &str,
    leaf: &Map<String, J>,
    pointer: &str,
    drafts: &mut HashMap<String, String>,
    edits: &mut Vec<(String, J)>,
) {
    let kind = leaf
        .get(VALUE_TYPE)
        .and_then(leaf_tag)
        .and_then(Kind::from_tag);
    let payload = leaf.get(VALUE).unwrap_or(&J::Null);
    let value_ptr = format!("{}/{}", pointer, VALUE);
    ui.horizontal(|ui| {
        ui.label(key);
        match kind {
            Some(Kind::Bool) => {
                let mut b = payload.as_bool().unwrap_or(false);
                if ui.checkbox(&mut b, "").changed() {
                    edits.push((value_ptr, J::Bool(b)));
                }
            }
            Some(Kind::Float) if payload.is_number() => {
                let mut f = payload.as_f64().unwrap_or_default();
                if ui.add(egui::DragValue::new(&mut f).speed(0.1)).changed() {
                    if let Some(n) = serde_json::Number::from_f64(f) {
                        edits.push((value_ptr, J::Number(n)));
                    }
                }
            }
            Some(k) => {
                let draft = drafts
                    .entry(value_ptr.clone())
                    .or_insert_with(|| payload_text(payload));
                if ui.text_edit_singleline(draft).changed() {
                    edits.push((value_ptr, parse_draft(k, draft)));
                }
            }
            None => {
                ui.label(format!("{} (unsupported VALUE_TYPE)", payload));
            }
        }
        if let Some(k) = kind {
            ui.weak(k.name());
        }
    });
}

fn payload_text(v: &J) -> String {
    match v {
        J::String(s) => s.clone(),
        other => other.to_string(),
    }
}

// INT drafts that parse become numbers; anything else is passed on as text
// and left to the checker.
fn parse_draft(kind: Kind, text: &str) -> J {
    match kind {
        Kind::Int => text
            .trim()
            .parse::<i64>()
            .map(J::from)
            .unwrap_or_else(|_| J::String(text.to_string())),
        Kind::Float => text
            .trim()
            .parse::<f64>()
            .ok()
            .and_then(serde_json::Number::from_f64)
            .map(J::Number)
            .unwrap_or_else(|| J::String(text.to_string())),
        _ => J::String(text.to_string()),
    }
}

fn main() -> eframe::Result<()> {
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();
    let native_options = eframe::NativeOptions {
        viewport: egui::viewport::ViewportBuilder::default()
            .with_inner_size([900.0, 700.0])
            .with_min_inner_size([600.0, 400.0]),
        ..Default::default()
    };
    eframe::run_native(
        "Mod Settings Editor",
        native_options,
        Box::new(|cc| Ok(Box::new(AppGui::new(cc)))),
    )
}
