//! NTFS on-disk structures: boot sector, FILE records, INDX records and
//! runlists.

pub mod boot;
pub mod fmt;
pub mod indx;
pub mod record;
pub mod runlist;

pub use boot::{parse_boot_sector, BootSector};
pub use fmt::{allows_multiple, attribute_name, windows_time};
pub use indx::{parse_indx_record, IndxDirEntry, IndxRecord};
pub use record::{
    apply_fixup, best_name, parse_attribute, parse_attribute_list, parse_file_name_content,
    parse_file_record, parse_index_root, read_attributes, AttrContent, Attribute, AttributeBody,
    AttributeListEntry, AttrSlot, FileNameAttr, FileRecordHeader, IndexDirEntry, IndexRoot,
    StandardInformation,
};
pub use runlist::{decode_runlist, RunlistEntry};
