use slotmap::new_key_type;

new_key_type! {
    pub struct LibraryId;
    pub struct MasterId;
    pub struct ChipId;
    pub struct InstanceId;
    pub struct NetId;
}
