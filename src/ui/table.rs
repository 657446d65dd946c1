use crate::object::NdfFile;
use crate::storage::{DbStats, ObjectRecord};
use tabled::{Table, Tabled, settings::Style};

#[derive(Tabled)]
pub struct TableRow {
    #[tabled(rename = "Metric")]
    pub metric: String,
    #[tabled(rename = "Value")]
    pub value: String,
}

#[derive(Tabled)]
struct ObjectRow {
    #[tabled(rename = "Id")]
    id: i64,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Class")]
    class_name: String,
    #[tabled(rename = "Export path")]
    export_path: String,
    #[tabled(rename = "Top")]
    top: &'static str,
}

#[derive(Tabled)]
struct FileRow {
    #[tabled(rename = "Id")]
    id: i64,
    #[tabled(rename = "VFS path")]
    vfs_path: String,
    #[tabled(rename = "Archive")]
    archive_path: String,
    #[tabled(rename = "Version")]
    version: String,
    #[tabled(rename = "Current")]
    current: &'static str,
}

fn yes_no(flag: bool) -> &'static str {
    if flag { "yes" } else { "" }
}

#[derive(Default)]
pub struct TableBuilder {
    rows: Vec<TableRow>,
}

impl TableBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_row(&mut self, label: &str, value: impl ToString) {
        self.rows.push(TableRow {
            metric: label.to_string(),
            value: value.to_string(),
        });
    }

    pub fn build(&self) -> String {
        if self.rows.is_empty() {
            return String::new();
        }
        Table::new(&self.rows).with(Style::rounded()).to_string()
    }
}

pub fn stats_table(stats: &DbStats) -> String {
    let mut builder = TableBuilder::new();
    builder.add_row("Files", stats.files);
    builder.add_row("Objects", stats.objects);
    builder.add_row("Properties", stats.properties);
    builder.add_row("Unresolved object references", stats.unresolved_object_references);
    builder.add_row("Unresolved import references", stats.unresolved_import_references);
    builder.build()
}

pub fn object_table(objects: &[ObjectRecord]) -> String {
    let rows: Vec<ObjectRow> = objects
        .iter()
        .map(|o| ObjectRow {
            id: o.id,
            name: o.name.clone(),
            class_name: o.class_name.clone(),
            export_path: o.export_path.clone(),
            top: yes_no(o.is_top_object),
        })
        .collect();
    Table::new(rows).with(Style::rounded()).to_string()
}

pub fn file_table(files: &[NdfFile]) -> String {
    let rows: Vec<FileRow> = files
        .iter()
        .map(|f| FileRow {
            id: f.id,
            vfs_path: f.vfs_path.clone(),
            archive_path: f.archive_path.clone(),
            version: f.version.clone(),
            current: yes_no(f.is_current),
        })
        .collect();
    Table::new(rows).with(Style::rounded()).to_string()
}
