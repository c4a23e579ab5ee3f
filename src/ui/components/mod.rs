mod command_input;
mod input;
mod key_result;
mod module_picker;

pub use command_input::{CommandEvent, CommandInput};
pub use input::{InputResult, TextInput};
pub use key_result::KeyResult;
pub use module_picker::{ModulePicker, ModulePickerEvent, PickerOption};
