//! Face attribute taxonomy.
//!
//! Every semantic axis (gender, age, mask, ...) is an [`AttributeGroup`]
//! whose members are mutually exclusive. A record holds one
//! [`Selection`] per group, so a group can never have two members set at
//! once; "nothing selected" is the explicit [`Selection::Unknown`] state,
//! distinct from any named member.
//!
//! Member order is the encoded order: the first member of each group is
//! code 0.

use serde::{Deserialize, Serialize};

/// A member of one attribute group.
pub trait GroupMember: Copy + Eq + std::fmt::Debug + 'static {
    /// The group this member type belongs to.
    const GROUP: AttributeGroup;

    /// All members in encoded order.
    const ALL: &'static [Self];

    /// Member chosen for a code outside `0..ALL.len()`.
    const FALLBACK: Self;

    /// Short member name (e.g. `"uncertain"`).
    fn name(&self) -> &'static str;

    /// Per-member flag name used in the flat serializable form
    /// (e.g. `"uncertainmouth"`).
    fn flag(&self) -> &'static str;

    /// Encoded value of this member.
    fn code(&self) -> u8 {
        Self::ALL.iter().position(|m| m == self).unwrap_or(0) as u8
    }

    /// Decode an integer code, using [`GroupMember::FALLBACK`] when out of range.
    fn from_code(code: i64) -> Self {
        usize::try_from(code)
            .ok()
            .and_then(|i| Self::ALL.get(i))
            .copied()
            .unwrap_or(Self::FALLBACK)
    }

    /// Look up a member by its short name, case-insensitively.
    fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|m| m.name().eq_ignore_ascii_case(name))
    }
}

macro_rules! attribute_group {
    (
        $(#[$meta:meta])*
        $name:ident in $group:ident, fallback $fallback:ident {
            $( $(#[$vmeta:meta])* $variant:ident => ($label:literal, $flag:literal) ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $( $(#[$vmeta])* $variant ),+
        }

        impl GroupMember for $name {
            const GROUP: AttributeGroup = AttributeGroup::$group;
            const ALL: &'static [Self] = &[$( $name::$variant ),+];
            const FALLBACK: Self = $name::$fallback;

            fn name(&self) -> &'static str {
                match self {
                    $( $name::$variant => $label ),+
                }
            }

            fn flag(&self) -> &'static str {
                match self {
                    $( $name::$variant => $flag ),+
                }
            }
        }

        impl From<$name> for AttributeValue {
            fn from(member: $name) -> Self {
                AttributeValue::$group(member)
            }
        }
    };
}

attribute_group! {
    /// Gender. Persisted as a single bit (1 = male).
    Gender in Gender, fallback Male {
        Female => ("female", "isfemale"),
        Male => ("male", "ismale"),
    }
}

attribute_group! {
    /// Age bracket.
    Age in Age, fallback Children {
        Young => ("young", "young"),
        Middle => ("middle", "middle"),
        Old => ("old", "old"),
        Children => ("children", "children"),
    }
}

attribute_group! {
    /// Face mask.
    Mask in Mask, fallback Yes {
        No => ("no", "nomask"),
        Yes => ("yes", "mask"),
    }
}

attribute_group! {
    /// Mouth state.
    Mouth in Mouth, fallback Uncertain {
        Closed => ("closed", "closemouth"),
        Open => ("open", "openmouth"),
        /// Mouth hidden, e.g. behind a mask
        Uncertain => ("uncertain", "uncertainmouth"),
    }
}

attribute_group! {
    /// Clear eyeglasses.
    Eyeglass in Eyeglass, fallback Yes {
        No => ("no", "noeyeglass"),
        Yes => ("yes", "eyeglass"),
    }
}

attribute_group! {
    /// Sunglasses. Only code 1 reads back as `Yes`.
    Sunglass in Sunglass, fallback No {
        No => ("no", "nosunglass"),
        Yes => ("yes", "sunglass"),
    }
}

attribute_group! {
    /// Eye state.
    Eye in Eye, fallback Uncertain {
        Open => ("open", "openeye"),
        Closed => ("closed", "closeeye"),
        /// Eyes hidden, e.g. behind sunglasses
        Uncertain => ("uncertain", "uncertaineye"),
    }
}

attribute_group! {
    /// Facial expression.
    Emotion in Emotion, fallback Normal {
        Normal => ("normal", "norm_emotion"),
        Laugh => ("laugh", "laugh"),
        Shock => ("shock", "shock"),
    }
}

attribute_group! {
    /// Motion or focus blur.
    Blur in Blur, fallback Yes {
        No => ("no", "noblur"),
        Yes => ("yes", "blur"),
    }
}

attribute_group! {
    /// Lighting conditions on the face.
    Illumination in Illumination, fallback Normal {
        Normal => ("normal", "norm_illumination"),
        Dim => ("dim", "dim"),
        Bright => ("bright", "bright"),
        Backlight => ("backlight", "backlight"),
        /// Half-lit face
        YinYang => ("yin-yang", "yinyang"),
    }
}

attribute_group! {
    /// Head yaw.
    Yaw in Yaw, fallback Normal {
        Normal => ("normal", "norm_yaw"),
        Deg30 => ("30", "yaw_30"),
        Deg60 => ("60", "yaw_60"),
    }
}

attribute_group! {
    /// Head roll.
    Roll in Roll, fallback Normal {
        Normal => ("normal", "norm_roll"),
        Deg20 => ("20", "roll_20"),
        Deg45 => ("45", "roll_45"),
    }
}

attribute_group! {
    /// Head pitch.
    Pitch in Pitch, fallback Normal {
        Normal => ("normal", "norm_pitch"),
        Up20 => ("20up", "pitch_20up"),
        Up45 => ("45up", "pitch_45up"),
        Down20 => ("20down", "pitch_20down"),
        Down45 => ("45down", "pitch_45down"),
    }
}

// ============================================================================
// Groups
// ============================================================================

/// One semantic attribute axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributeGroup {
    Gender,
    Age,
    Mask,
    Mouth,
    Eyeglass,
    Sunglass,
    Eye,
    Emotion,
    Blur,
    Illumination,
    Yaw,
    Roll,
    Pitch,
}

impl AttributeGroup {
    /// All groups in label-file order.
    pub fn all() -> &'static [AttributeGroup] {
        &[
            AttributeGroup::Gender,
            AttributeGroup::Age,
            AttributeGroup::Mask,
            AttributeGroup::Mouth,
            AttributeGroup::Eyeglass,
            AttributeGroup::Sunglass,
            AttributeGroup::Eye,
            AttributeGroup::Emotion,
            AttributeGroup::Blur,
            AttributeGroup::Illumination,
            AttributeGroup::Yaw,
            AttributeGroup::Roll,
            AttributeGroup::Pitch,
        ]
    }

    /// Group name as used in configuration and UI wiring.
    pub fn name(&self) -> &'static str {
        match self {
            AttributeGroup::Gender => "gender",
            AttributeGroup::Age => "age",
            AttributeGroup::Mask => "mask",
            AttributeGroup::Mouth => "mouth",
            AttributeGroup::Eyeglass => "eyeglass",
            AttributeGroup::Sunglass => "sunglass",
            AttributeGroup::Eye => "eye",
            AttributeGroup::Emotion => "emotion",
            AttributeGroup::Blur => "blur",
            AttributeGroup::Illumination => "illumination",
            AttributeGroup::Yaw => "yaw",
            AttributeGroup::Roll => "roll",
            AttributeGroup::Pitch => "pitch",
        }
    }

    /// Find a group by name, case-insensitively.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::all()
            .iter()
            .copied()
            .find(|g| g.name().eq_ignore_ascii_case(name))
    }

    /// Member names in encoded order.
    pub fn member_names(&self) -> Vec<&'static str> {
        fn names<T: GroupMember>() -> Vec<&'static str> {
            T::ALL.iter().map(|m| m.name()).collect()
        }
        match self {
            AttributeGroup::Gender => names::<Gender>(),
            AttributeGroup::Age => names::<Age>(),
            AttributeGroup::Mask => names::<Mask>(),
            AttributeGroup::Mouth => names::<Mouth>(),
            AttributeGroup::Eyeglass => names::<Eyeglass>(),
            AttributeGroup::Sunglass => names::<Sunglass>(),
            AttributeGroup::Eye => names::<Eye>(),
            AttributeGroup::Emotion => names::<Emotion>(),
            AttributeGroup::Blur => names::<Blur>(),
            AttributeGroup::Illumination => names::<Illumination>(),
            AttributeGroup::Yaw => names::<Yaw>(),
            AttributeGroup::Roll => names::<Roll>(),
            AttributeGroup::Pitch => names::<Pitch>(),
        }
    }
}

// ============================================================================
// Selection
// ============================================================================

/// The state of one group on one record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Selection<T> {
    /// No member selected (e.g. a file written before the group existed).
    Unknown,
    /// Exactly one member selected.
    Selected(T),
}

impl<T> Default for Selection<T> {
    fn default() -> Self {
        Selection::Unknown
    }
}

impl<T: GroupMember> Selection<T> {
    pub fn member(&self) -> Option<T> {
        match self {
            Selection::Unknown => None,
            Selection::Selected(m) => Some(*m),
        }
    }

    pub fn is(&self, member: T) -> bool {
        self.member() == Some(member)
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, Selection::Unknown)
    }

    /// Encoded value; `Unknown` encodes as the first member's code.
    pub fn code(&self) -> u8 {
        self.member().map(|m| m.code()).unwrap_or(0)
    }
}

impl<T> From<T> for Selection<T> {
    fn from(member: T) -> Self {
        Selection::Selected(member)
    }
}

// ============================================================================
// Attribute values
// ============================================================================

/// A specific member of a specific group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "group", content = "member", rename_all = "snake_case")]
pub enum AttributeValue {
    Gender(Gender),
    Age(Age),
    Mask(Mask),
    Mouth(Mouth),
    Eyeglass(Eyeglass),
    Sunglass(Sunglass),
    Eye(Eye),
    Emotion(Emotion),
    Blur(Blur),
    Illumination(Illumination),
    Yaw(Yaw),
    Roll(Roll),
    Pitch(Pitch),
}

impl AttributeValue {
    pub fn group(&self) -> AttributeGroup {
        match self {
            AttributeValue::Gender(_) => AttributeGroup::Gender,
            AttributeValue::Age(_) => AttributeGroup::Age,
            AttributeValue::Mask(_) => AttributeGroup::Mask,
            AttributeValue::Mouth(_) => AttributeGroup::Mouth,
            AttributeValue::Eyeglass(_) => AttributeGroup::Eyeglass,
            AttributeValue::Sunglass(_) => AttributeGroup::Sunglass,
            AttributeValue::Eye(_) => AttributeGroup::Eye,
            AttributeValue::Emotion(_) => AttributeGroup::Emotion,
            AttributeValue::Blur(_) => AttributeGroup::Blur,
            AttributeValue::Illumination(_) => AttributeGroup::Illumination,
            AttributeValue::Yaw(_) => AttributeGroup::Yaw,
            AttributeValue::Roll(_) => AttributeGroup::Roll,
            AttributeValue::Pitch(_) => AttributeGroup::Pitch,
        }
    }

    /// Member name within its group.
    pub fn member_name(&self) -> &'static str {
        match self {
            AttributeValue::Gender(m) => m.name(),
            AttributeValue::Age(m) => m.name(),
            AttributeValue::Mask(m) => m.name(),
            AttributeValue::Mouth(m) => m.name(),
            AttributeValue::Eyeglass(m) => m.name(),
            AttributeValue::Sunglass(m) => m.name(),
            AttributeValue::Eye(m) => m.name(),
            AttributeValue::Emotion(m) => m.name(),
            AttributeValue::Blur(m) => m.name(),
            AttributeValue::Illumination(m) => m.name(),
            AttributeValue::Yaw(m) => m.name(),
            AttributeValue::Roll(m) => m.name(),
            AttributeValue::Pitch(m) => m.name(),
        }
    }

    /// Resolve a `(group, member)` name pair, e.g. `("mouth", "uncertain")`.
    ///
    /// Handy for wiring UI checkboxes that only know their labels.
    pub fn parse(group: &str, member: &str) -> Option<Self> {
        let group = AttributeGroup::from_name(group)?;
        let value = match group {
            AttributeGroup::Gender => AttributeValue::Gender(Gender::from_name(member)?),
            AttributeGroup::Age => AttributeValue::Age(Age::from_name(member)?),
            AttributeGroup::Mask => AttributeValue::Mask(Mask::from_name(member)?),
            AttributeGroup::Mouth => AttributeValue::Mouth(Mouth::from_name(member)?),
            AttributeGroup::Eyeglass => AttributeValue::Eyeglass(Eyeglass::from_name(member)?),
            AttributeGroup::Sunglass => AttributeValue::Sunglass(Sunglass::from_name(member)?),
            AttributeGroup::Eye => AttributeValue::Eye(Eye::from_name(member)?),
            AttributeGroup::Emotion => AttributeValue::Emotion(Emotion::from_name(member)?),
            AttributeGroup::Blur => AttributeValue::Blur(Blur::from_name(member)?),
            AttributeGroup::Illumination => {
                AttributeValue::Illumination(Illumination::from_name(member)?)
            }
            AttributeGroup::Yaw => AttributeValue::Yaw(Yaw::from_name(member)?),
            AttributeGroup::Roll => AttributeValue::Roll(Roll::from_name(member)?),
            AttributeGroup::Pitch => AttributeValue::Pitch(Pitch::from_name(member)?),
        };
        Some(value)
    }
}

// ============================================================================
// FaceAttributes
// ============================================================================

/// The full attribute state of one face box.
///
/// Also serves as the per-record default template handed to new records.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct FaceAttributes {
    pub gender: Selection<Gender>,
    pub age: Selection<Age>,
    pub mask: Selection<Mask>,
    pub mouth: Selection<Mouth>,
    pub eyeglass: Selection<Eyeglass>,
    pub sunglass: Selection<Sunglass>,
    pub eye: Selection<Eye>,
    pub emotion: Selection<Emotion>,
    pub blur: Selection<Blur>,
    pub illumination: Selection<Illumination>,
    pub yaw: Selection<Yaw>,
    pub roll: Selection<Roll>,
    pub pitch: Selection<Pitch>,
}

impl FaceAttributes {
    /// All groups unknown.
    pub fn new() -> Self {
        Self::default()
    }

    /// Every group set to its first ("no"/"normal") member.
    pub fn baseline() -> Self {
        Self {
            gender: Gender::Female.into(),
            age: Age::Young.into(),
            mask: Mask::No.into(),
            mouth: Mouth::Closed.into(),
            eyeglass: Eyeglass::No.into(),
            sunglass: Sunglass::No.into(),
            eye: Eye::Open.into(),
            emotion: Emotion::Normal.into(),
            blur: Blur::No.into(),
            illumination: Illumination::Normal.into(),
            yaw: Yaw::Normal.into(),
            roll: Roll::Normal.into(),
            pitch: Pitch::Normal.into(),
        }
    }

    /// Builder-style [`FaceAttributes::select`].
    pub fn with(mut self, value: AttributeValue) -> Self {
        self.select(value);
        self
    }

    /// The selected member of `group`, if any.
    pub fn get(&self, group: AttributeGroup) -> Option<AttributeValue> {
        match group {
            AttributeGroup::Gender => self.gender.member().map(AttributeValue::Gender),
            AttributeGroup::Age => self.age.member().map(AttributeValue::Age),
            AttributeGroup::Mask => self.mask.member().map(AttributeValue::Mask),
            AttributeGroup::Mouth => self.mouth.member().map(AttributeValue::Mouth),
            AttributeGroup::Eyeglass => self.eyeglass.member().map(AttributeValue::Eyeglass),
            AttributeGroup::Sunglass => self.sunglass.member().map(AttributeValue::Sunglass),
            AttributeGroup::Eye => self.eye.member().map(AttributeValue::Eye),
            AttributeGroup::Emotion => self.emotion.member().map(AttributeValue::Emotion),
            AttributeGroup::Blur => self.blur.member().map(AttributeValue::Blur),
            AttributeGroup::Illumination => {
                self.illumination.member().map(AttributeValue::Illumination)
            }
            AttributeGroup::Yaw => self.yaw.member().map(AttributeValue::Yaw),
            AttributeGroup::Roll => self.roll.member().map(AttributeValue::Roll),
            AttributeGroup::Pitch => self.pitch.member().map(AttributeValue::Pitch),
        }
    }

    /// Whether `value` is the current selection of its group.
    pub fn is_selected(&self, value: AttributeValue) -> bool {
        self.get(value.group()) == Some(value)
    }

    /// Set or clear one member.
    ///
    /// `selected = true` replaces the group's state with `value` and then
    /// applies the cross-group implications:
    ///
    /// - mask = yes forces mouth = uncertain
    /// - mouth = uncertain forces mask = yes
    /// - sunglass = yes forces eye = uncertain
    /// - eye = uncertain forces sunglass = yes
    ///
    /// `selected = false` clears the group only when `value` is its current
    /// selection. Returns the implied change, if one was applied.
    pub fn set(&mut self, value: AttributeValue, selected: bool) -> Option<AttributeValue> {
        if !selected {
            if self.is_selected(value) {
                self.clear(value.group());
            }
            return None;
        }

        self.assign(value);
        let implied = match value {
            AttributeValue::Mask(Mask::Yes) => Some(AttributeValue::Mouth(Mouth::Uncertain)),
            AttributeValue::Mouth(Mouth::Uncertain) => Some(AttributeValue::Mask(Mask::Yes)),
            AttributeValue::Sunglass(Sunglass::Yes) => Some(AttributeValue::Eye(Eye::Uncertain)),
            AttributeValue::Eye(Eye::Uncertain) => Some(AttributeValue::Sunglass(Sunglass::Yes)),
            _ => None,
        };
        if let Some(implied) = implied {
            log::trace!("{:?} implies {:?}", value, implied);
            self.assign(implied);
        }
        implied
    }

    /// Select `value`, applying implications.
    pub fn select(&mut self, value: AttributeValue) -> Option<AttributeValue> {
        self.set(value, true)
    }

    /// Reset `group` to `Unknown`.
    pub fn clear(&mut self, group: AttributeGroup) {
        match group {
            AttributeGroup::Gender => self.gender = Selection::Unknown,
            AttributeGroup::Age => self.age = Selection::Unknown,
            AttributeGroup::Mask => self.mask = Selection::Unknown,
            AttributeGroup::Mouth => self.mouth = Selection::Unknown,
            AttributeGroup::Eyeglass => self.eyeglass = Selection::Unknown,
            AttributeGroup::Sunglass => self.sunglass = Selection::Unknown,
            AttributeGroup::Eye => self.eye = Selection::Unknown,
            AttributeGroup::Emotion => self.emotion = Selection::Unknown,
            AttributeGroup::Blur => self.blur = Selection::Unknown,
            AttributeGroup::Illumination => self.illumination = Selection::Unknown,
            AttributeGroup::Yaw => self.yaw = Selection::Unknown,
            AttributeGroup::Roll => self.roll = Selection::Unknown,
            AttributeGroup::Pitch => self.pitch = Selection::Unknown,
        }
    }

    /// True when no group is `Unknown`.
    pub fn is_complete(&self) -> bool {
        AttributeGroup::all().iter().all(|g| self.get(*g).is_some())
    }

    /// Groups that are still `Unknown`.
    pub fn unknown_groups(&self) -> Vec<AttributeGroup> {
        AttributeGroup::all()
            .iter()
            .copied()
            .filter(|g| self.get(*g).is_none())
            .collect()
    }

    /// Every member flag of every group with its on/off state, in group
    /// and member order.
    pub fn flags(&self) -> Vec<(&'static str, bool)> {
        fn push<T: GroupMember>(out: &mut Vec<(&'static str, bool)>, sel: &Selection<T>) {
            out.extend(T::ALL.iter().map(|m| (m.flag(), sel.is(*m))));
        }
        let mut out = Vec::new();
        push(&mut out, &self.gender);
        push(&mut out, &self.age);
        push(&mut out, &self.mask);
        push(&mut out, &self.mouth);
        push(&mut out, &self.eyeglass);
        push(&mut out, &self.sunglass);
        push(&mut out, &self.eye);
        push(&mut out, &self.emotion);
        push(&mut out, &self.blur);
        push(&mut out, &self.illumination);
        push(&mut out, &self.yaw);
        push(&mut out, &self.roll);
        push(&mut out, &self.pitch);
        out
    }

    fn assign(&mut self, value: AttributeValue) {
        match value {
            AttributeValue::Gender(m) => self.gender = m.into(),
            AttributeValue::Age(m) => self.age = m.into(),
            AttributeValue::Mask(m) => self.mask = m.into(),
            AttributeValue::Mouth(m) => self.mouth = m.into(),
            AttributeValue::Eyeglass(m) => self.eyeglass = m.into(),
            AttributeValue::Sunglass(m) => self.sunglass = m.into(),
            AttributeValue::Eye(m) => self.eye = m.into(),
            AttributeValue::Emotion(m) => self.emotion = m.into(),
            AttributeValue::Blur(m) => self.blur = m.into(),
            AttributeValue::Illumination(m) => self.illumination = m.into(),
            AttributeValue::Yaw(m) => self.yaw = m.into(),
            AttributeValue::Roll(m) => self.roll = m.into(),
            AttributeValue::Pitch(m) => self.pitch = m.into(),
        }
    }
}
