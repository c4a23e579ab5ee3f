mod dashboard;
mod messages;
mod running_modules;
mod status_grid;
mod status_selector;
mod value_panel;
mod values;

pub use dashboard::DashboardView;
pub use messages::MessagesView;
pub use running_modules::RunningModulesView;
pub use status_grid::StatusGridView;
pub use status_selector::StatusSelectorView;
pub use value_panel::ValuePanelView;
pub use values::ValueTicker;
