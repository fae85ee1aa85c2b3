mod chip;
mod device;
mod work_item;

pub use chip::Chip;
pub use device::Device;
pub use work_item::WorkItem;
