//! Deterministic sample data
//!
//! Builds descriptor objects covering every leaf kind, nested
//! list/map/pair trees and both reference kinds. Values come from a
//! xorshift sequence, so a given seed always yields the same objects.

use crate::object::NdfObject;
use crate::property::{Property, PropertyKind, PropertyValue, Reference};

const CLASSES: &[&str] = &[
    "TEntityDescriptor",
    "TWeaponManagerModuleDescriptor",
    "TDepictionDescriptor",
    "TAmmunitionDescriptor",
];

pub struct FixtureBuilder {
    state: u64,
}

impl FixtureBuilder {
    pub fn new(seed: u64) -> Self {
        let state = if seed == 0 { 0x9E37_79B9_7F4A_7C15 } else { seed };
        Self { state }
    }

    fn next_u64(&mut self) -> u64 {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.state = x;
        x
    }

    fn next_u32(&mut self) -> u32 {
        (self.next_u64() >> 32) as u32
    }

    fn next_i32(&mut self) -> i32 {
        self.next_u32() as i32
    }

    /// Float with two decimals in [-500, 500)
    fn next_f32(&mut self) -> f32 {
        (self.next_u32() % 100_000) as f32 / 100.0 - 500.0
    }

    fn hex(&mut self, digits: usize) -> String {
        let mut out = String::with_capacity(digits);
        while out.len() < digits {
            out.push_str(&format!("{:016X}", self.next_u64()));
        }
        out.truncate(digits);
        out
    }

    /// One value of the given leaf kind; `None` for containers
    pub fn leaf(&mut self, kind: PropertyKind) -> Option<PropertyValue> {
        let value = match kind {
            PropertyKind::Bool => PropertyValue::Bool(self.next_u32() % 2 == 0),
            PropertyKind::Int8 => PropertyValue::Int8(self.next_u32() as i8),
            PropertyKind::Int16 => PropertyValue::Int16(self.next_u32() as i16),
            PropertyKind::Int32 => PropertyValue::Int32(self.next_i32()),
            PropertyKind::UInt8 => PropertyValue::UInt8(self.next_u32() as u8),
            PropertyKind::UInt16 => PropertyValue::UInt16(self.next_u32() as u16),
            PropertyKind::UInt32 => PropertyValue::UInt32(self.next_u32()),
            PropertyKind::Float32 => PropertyValue::Float32(self.next_f32()),
            PropertyKind::Float64 => PropertyValue::Float64(self.next_u64() as f64 / 3.0),
            PropertyKind::String => PropertyValue::String(format!("Str_{}", self.hex(8))),
            PropertyKind::WideString => PropertyValue::WideString(format!("Größe_{}", self.hex(6))),
            PropertyKind::F32Vec2 => PropertyValue::F32Vec2([self.next_f32(), self.next_f32()]),
            PropertyKind::F32Vec3 => PropertyValue::F32Vec3([self.next_f32(), self.next_f32(), self.next_f32()]),
            PropertyKind::F32Vec4 => {
                PropertyValue::F32Vec4([self.next_f32(), self.next_f32(), self.next_f32(), self.next_f32()])
            }
            PropertyKind::S32Vec2 => PropertyValue::S32Vec2([self.next_i32(), self.next_i32()]),
            PropertyKind::S32Vec3 => PropertyValue::S32Vec3([self.next_i32(), self.next_i32(), self.next_i32()]),
            PropertyKind::S32Vec4 => {
                PropertyValue::S32Vec4([self.next_i32(), self.next_i32(), self.next_i32(), self.next_i32()])
            }
            PropertyKind::Color => {
                let [r, g, b, a] = self.next_u32().to_le_bytes();
                PropertyValue::Color([r, g, b, a])
            }
            PropertyKind::ObjectReference => {
                PropertyValue::ObjectReference(Reference::unresolved(format!("Descriptor_{}", self.hex(4))))
            }
            PropertyKind::ImportReference => {
                PropertyValue::ImportReference(Reference::unresolved(format!("$/GFX/{}", self.hex(4))))
            }
            PropertyKind::Guid => {
                let h = self.hex(32).to_lowercase();
                PropertyValue::Guid(format!(
                    "GUID:{{{}-{}-{}-{}-{}}}",
                    &h[0..8],
                    &h[8..12],
                    &h[12..16],
                    &h[16..20],
                    &h[20..32]
                ))
            }
            PropertyKind::PathReference => {
                PropertyValue::PathReference(format!("GameData:/Gameplay/{}.ndf", self.hex(6)))
            }
            PropertyKind::LocalisationHash => PropertyValue::LocalisationHash(self.hex(16)),
            PropertyKind::Hash => PropertyValue::Hash(self.hex(16)),
            PropertyKind::List | PropertyKind::Map | PropertyKind::Pair => return None,
        };
        Some(value)
    }

    /// List of maps from slot names to (ammo count, reload time) pairs
    pub fn loadout(&mut self, maps: usize, entries: usize) -> PropertyValue {
        let list = (0..maps)
            .map(|m| {
                let map = (0..entries)
                    .map(|e| {
                        let key = Property::element(PropertyValue::String(format!("Slot_{}_{}", m, e)));
                        let pair = PropertyValue::pair(
                            Property::element(PropertyValue::Int32((self.next_u32() % 500) as i32)),
                            Property::element(PropertyValue::Float32(self.next_f32())),
                        );
                        (key, Property::element(pair))
                    })
                    .collect();
                Property::element(PropertyValue::Map(map))
            })
            .collect();
        PropertyValue::List(list)
    }

    pub fn object_name(prefix: &str, index: usize) -> String {
        format!("{}_{:03}", prefix, index)
    }

    pub fn export_path(prefix: &str, index: usize) -> String {
        format!("$/GFX/{}/{}", prefix, Self::object_name(prefix, index))
    }

    /// `count` objects, each holding every leaf kind, a nested loadout, and an object
    /// and an import reference to its successor (the last one points back to the first)
    pub fn objects(&mut self, prefix: &str, count: usize) -> Vec<NdfObject> {
        (0..count)
            .map(|i| {
                let class = CLASSES[i % CLASSES.len()];
                let mut object = NdfObject::new(
                    Self::object_name(prefix, i),
                    class,
                    Self::export_path(prefix, i),
                    i % 3 != 2,
                );

                for kind in PropertyKind::all() {
                    if kind.is_container() || matches!(kind, PropertyKind::ObjectReference | PropertyKind::ImportReference) {
                        continue;
                    }
                    if let Some(value) = self.leaf(*kind) {
                        object.push_property(format!("Field_{}", kind.as_str()), value);
                    }
                }

                let next = (i + 1) % count;
                object.push_property(
                    "Next",
                    PropertyValue::ObjectReference(Reference::unresolved(Self::object_name(prefix, next))),
                );
                object.push_property(
                    "Import",
                    PropertyValue::ImportReference(Reference::unresolved(Self::export_path(prefix, next))),
                );
                let loadout = self.loadout(2, 2);
                object.push_property("Loadout", loadout);
                object
            })
            .collect()
    }
}
