//! Replays PlaceObject / RemoveObject / ShowFrame tags into per-frame
//! placement events, one timeline for the movie and one per sprite.

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::{debug, trace, warn};

use crate::{
    error::{Error, Result},
    sound::SoundStream,
    tag::{PlaceObject, PlaceObjectAction, Tag},
    types::{BlendMode, CharacterId, ColorTransform, Depth, Matrix},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type")]
pub enum CharacterKind {
    Shape,
    Sprite,
    Bitmap,
    /// A definition that is recognized but not decoded (text, buttons, ...).
    Opaque { tag_code: u16 },
}

/// Every character defined anywhere in the movie. Ids share one namespace
/// across the root timeline and all sprites.
#[derive(Clone, Debug, Default, Serialize)]
#[serde(transparent)]
pub struct CharacterLibrary {
    characters: BTreeMap<CharacterId, CharacterKind>,
}

impl CharacterLibrary {
    /// Registers a definition. A repeated id keeps the first definition.
    pub fn register(&mut self, id: CharacterId, kind: CharacterKind) {
        if let Some(existing) = self.characters.get(&id) {
            warn!("Character {} redefined as {:?}, keeping {:?}", id, kind, existing);
            return;
        }
        trace!("Character {} registered as {:?}", id, kind);
        self.characters.insert(id, kind);
    }

    pub fn get(&self, id: CharacterId) -> Option<CharacterKind> {
        self.characters.get(&id).copied()
    }

    pub fn contains(&self, id: CharacterId) -> bool {
        self.characters.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.characters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.characters.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (CharacterId, CharacterKind)> + '_ {
        self.characters.iter().map(|(id, kind)| (*id, *kind))
    }
}

/// What currently occupies one depth.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PlacedCharacter {
    pub character_id: CharacterId,
    pub matrix: Matrix,
    pub color_transform: ColorTransform,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ratio: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clip_depth: Option<Depth>,
    pub blend_mode: BlendMode,
    pub is_visible: bool,
}

impl PlacedCharacter {
    fn new(character_id: CharacterId, place: &PlaceObject<'_>) -> Self {
        let mut placed = Self {
            character_id,
            matrix: Matrix::IDENTITY,
            color_transform: ColorTransform::IDENTITY,
            name: None,
            ratio: None,
            clip_depth: None,
            blend_mode: BlendMode::Normal,
            is_visible: true,
        };
        placed.apply(place);
        placed
    }

    /// Only the fields present in the tag change.
    fn apply(&mut self, place: &PlaceObject<'_>) {
        if let Some(matrix) = place.matrix {
            self.matrix = matrix;
        }
        if let Some(color_transform) = place.color_transform {
            self.color_transform = color_transform;
        }
        if let Some(ratio) = place.ratio {
            self.ratio = Some(ratio);
        }
        if let Some(name) = &place.name {
            self.name = Some(name.clone());
        }
        if let Some(clip_depth) = place.clip_depth {
            self.clip_depth = Some(clip_depth);
        }
        if let Some(blend_mode) = place.blend_mode {
            self.blend_mode = blend_mode;
        }
        if let Some(is_visible) = place.is_visible {
            self.is_visible = is_visible;
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum PlacementEvent {
    Place {
        depth: Depth,
        character_id: CharacterId,
        #[serde(skip_serializing_if = "Option::is_none")]
        matrix: Option<Matrix>,
        #[serde(skip_serializing_if = "Option::is_none")]
        color_transform: Option<ColorTransform>,
        #[serde(skip_serializing_if = "Option::is_none")]
        name: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        ratio: Option<u16>,
        #[serde(skip_serializing_if = "Option::is_none")]
        clip_depth: Option<Depth>,
        #[serde(skip_serializing_if = "Option::is_none")]
        blend_mode: Option<BlendMode>,
        #[serde(skip_serializing_if = "Option::is_none")]
        is_visible: Option<bool>,
    },
    Modify {
        depth: Depth,
        #[serde(skip_serializing_if = "Option::is_none")]
        matrix: Option<Matrix>,
        #[serde(skip_serializing_if = "Option::is_none")]
        color_transform: Option<ColorTransform>,
        #[serde(skip_serializing_if = "Option::is_none")]
        name: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        ratio: Option<u16>,
        #[serde(skip_serializing_if = "Option::is_none")]
        clip_depth: Option<Depth>,
        #[serde(skip_serializing_if = "Option::is_none")]
        blend_mode: Option<BlendMode>,
        #[serde(skip_serializing_if = "Option::is_none")]
        is_visible: Option<bool>,
    },
    Remove {
        depth: Depth,
    },
}

impl PlacementEvent {
    pub fn depth(&self) -> Depth {
        match self {
            PlacementEvent::Place { depth, .. }
            | PlacementEvent::Modify { depth, .. }
            | PlacementEvent::Remove { depth } => *depth,
        }
    }

    fn place(character_id: CharacterId, place: &PlaceObject<'_>) -> Self {
        PlacementEvent::Place {
            depth: place.depth,
            character_id,
            matrix: place.matrix,
            color_transform: place.color_transform,
            name: place.name.clone(),
            ratio: place.ratio,
            clip_depth: place.clip_depth,
            blend_mode: place.blend_mode,
            is_visible: place.is_visible,
        }
    }

    fn modify(place: &PlaceObject<'_>) -> Self {
        PlacementEvent::Modify {
            depth: place.depth,
            matrix: place.matrix,
            color_transform: place.color_transform,
            name: place.name.clone(),
            ratio: place.ratio,
            clip_depth: place.clip_depth,
            blend_mode: place.blend_mode,
            is_visible: place.is_visible,
        }
    }
}

/// Depth → placement map of one timeline while it plays.
#[derive(Clone, Debug, Default)]
pub struct DisplayListState {
    /// `None` for the root timeline.
    timeline: Option<CharacterId>,
    placements: BTreeMap<Depth, PlacedCharacter>,
}

impl DisplayListState {
    pub fn new(timeline: Option<CharacterId>) -> Self {
        Self {
            timeline,
            placements: BTreeMap::new(),
        }
    }


    pub fn get(&self, depth: Depth) -> Option<&PlacedCharacter> {
        self.placements.get(&depth)
    }

    pub fn len(&self) -> usize {
        self.placements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.placements.is_empty()
    }

    pub fn snapshot(&self) -> BTreeMap<Depth, PlacedCharacter> {
        self.placements.clone()
    }

    fn place(&mut self, position: usize, depth: Depth, placed: PlacedCharacter) -> Result<()> {
        if self.placements.contains_key(&depth) {
            return Err(Error::DepthConflict {
                timeline: self.timeline,
                position,
                depth,
            });
        }
        self.placements.insert(depth, placed);
        Ok(())
    }

    fn modify(&mut self, position: usize, place: &PlaceObject<'_>) -> Result<()> {
        let depth = place.depth;
        let placed = self
            .placements
            .get_mut(&depth)
            .ok_or(Error::DepthNotFound {
                timeline: self.timeline,
                position,
                depth,
            })?;
        placed.apply(place);
        Ok(())
    }

    fn remove(&mut self, position: usize, depth: Depth) -> Result<PlacedCharacter> {
        self.placements
            .remove(&depth)
            .ok_or(Error::DepthNotFound {
                timeline: self.timeline,
                position,
                depth,
            })
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct Frame {
    pub index: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// Changes since the previous frame, in tag order.
    pub events: Vec<PlacementEvent>,
    /// The whole display list as it stands when this frame is shown.
    pub display_list: BTreeMap<Depth, PlacedCharacter>,
}

#[derive(Clone, Debug, Serialize)]
pub struct Timeline<'a> {
    /// `None` for the root movie.
    pub id: Option<CharacterId>,
    /// Frame count declared by the movie header or DefineSprite.
    pub num_frames: u16,
    pub frames: Vec<Frame>,
    #[serde(skip)]
    pub sound_stream: Option<SoundStream<'a>>,
}

impl Timeline<'_> {
    pub fn frame(&self, index: u16) -> Option<&Frame> {
        self.frames.get(usize::from(index))
    }
}

enum TimelineState {
    BeforeStart,
    Playing {
        frame: u16,
        display_list: DisplayListState,
    },
    Ended,
}

/// The result of replaying a movie: its character library, the root timeline
/// and the timeline of every sprite, keyed by sprite id.
#[derive(Clone, Debug, Serialize)]
pub struct InterpretedMovie<'a> {
    pub library: CharacterLibrary,
    pub root: Timeline<'a>,
    pub sprites: BTreeMap<CharacterId, Timeline<'a>>,
}

/// Replays the root tag list. Sprites are replayed when their definition is
/// reached, each with its own depth map and frame counter.
pub fn interpret_movie<'a>(tags: &[Tag<'a>], num_frames: u16) -> Result<InterpretedMovie<'a>> {
    let mut interpreter = Interpreter::default();
    let root = interpreter.run_timeline(None, num_frames, tags)?;
    Ok(InterpretedMovie {
        library: interpreter.library,
        root,
        sprites: interpreter.sprites,
    })
}

#[derive(Default)]
struct Interpreter<'a> {
    library: CharacterLibrary,
    sprites: BTreeMap<CharacterId, Timeline<'a>>,
}

impl<'a> Interpreter<'a> {
    fn run_timeline(&mut self, id: Option<CharacterId>, num_frames: u16, tags: &[Tag<'a>]) -> Result<Timeline<'a>> {
        let mut timeline = Timeline {
            id,
            num_frames,
            frames: Vec::new(),
            sound_stream: None,
        };
        let mut events = Vec::new();
        let mut label: Option<String> = None;
        let mut state = TimelineState::BeforeStart;

        for (position, tag) in tags.iter().enumerate() {
            if let TimelineState::BeforeStart = state {
                state = TimelineState::Playing {
                    frame: 0,
                    display_list: DisplayListState::new(id),
                };
            }
            let TimelineState::Playing { frame, display_list } = &mut state else {
                break;
            };

            match tag {
                Tag::End => {
                    state = TimelineState::Ended;
                    break;
                }
                Tag::ShowFrame => {
                    trace!("{:?} frame {}: {} event(s)", id, frame, events.len());
                    timeline.frames.push(Frame {
                        index: *frame,
                        label: label.take(),
                        events: std::mem::take(&mut events),
                        display_list: display_list.snapshot(),
                    });
                    *frame = frame.saturating_add(1);
                }
                Tag::PlaceObject(place) => {
                    self.place_object(position, place, display_list, &mut events)?;
                }
                Tag::RemoveObject(remove) => {
                    display_list.remove(position, remove.depth)?;
                    events.push(PlacementEvent::Remove { depth: remove.depth });
                }
                Tag::FrameLabel(frame_label) => {
                    if let Some(previous) = label.replace(frame_label.label.clone()) {
                        debug!("Frame {} relabeled from {:?}", frame, previous);
                    }
                }
                Tag::DefineShape(shape) => self.library.register(shape.id, CharacterKind::Shape),
                Tag::DefineSprite(sprite) => {
                    self.library.register(sprite.id, CharacterKind::Sprite);
                    let sprite_timeline = self.run_timeline(Some(sprite.id), sprite.num_frames, &sprite.tags)?;
                    self.sprites.insert(sprite.id, sprite_timeline);
                }
                Tag::DefineBitsJpeg(bitmap) => self.library.register(bitmap.id, CharacterKind::Bitmap),
                Tag::DefineBitsLossless(bitmap) => self.library.register(bitmap.id, CharacterKind::Bitmap),
                Tag::SoundStreamHead(head) => {
                    if timeline.sound_stream.is_some() {
                        warn!("{:?}: second SoundStreamHead replaces the first", id);
                    }
                    timeline.sound_stream = Some(SoundStream::new(**head));
                }
                Tag::SoundStreamBlock(block) => match &mut timeline.sound_stream {
                    Some(stream) => stream.push_block(*block),
                    None => warn!("{:?}: SoundStreamBlock #{} without a stream head", id, position),
                },
                Tag::Opaque(opaque) => {
                    if let Some(character_id) = opaque.character_id() {
                        self.library.register(
                            character_id,
                            CharacterKind::Opaque {
                                tag_code: opaque.code,
                            },
                        );
                    }
                }
                Tag::SetBackgroundColor(_) | Tag::JpegTables(_) => {}
            }
        }

        if !events.is_empty() || label.is_some() {
            warn!(
                "{:?}: {} event(s) after the last ShowFrame discarded",
                id,
                events.len()
            );
        }
        if !matches!(state, TimelineState::Ended) {
            debug!("{:?}: tag list ended without an End tag", id);
        }
        if timeline.frames.len() != usize::from(num_frames) {
            debug!(
                "{:?}: declares {} frame(s), shows {}",
                id,
                num_frames,
                timeline.frames.len()
            );
        }
        Ok(timeline)
    }

    fn check_defined(
        &self,
        display_list: &DisplayListState,
        position: usize,
        depth: Depth,
        character_id: CharacterId,
    ) -> Result<()> {
        if self.library.contains(character_id) {
            Ok(())
        } else {
            Err(Error::UndefinedCharacterReference {
                timeline: display_list.timeline,
                position,
                depth,
                character_id,
            })
        }
    }

    fn place_object(
        &self,
        position: usize,
        place: &PlaceObject<'_>,
        display_list: &mut DisplayListState,
        events: &mut Vec<PlacementEvent>,
    ) -> Result<()> {
        let depth = place.depth;
        match place.action {
            PlaceObjectAction::Place(character_id) => {
                self.check_defined(display_list, position, depth, character_id)?;
                display_list.place(position, depth, PlacedCharacter::new(character_id, place))?;
                events.push(PlacementEvent::place(character_id, place));
            }
            PlaceObjectAction::Modify => {
                display_list.modify(position, place)?;
                events.push(PlacementEvent::modify(place));
            }
            // Replace: remove, then place; fields the tag omits carry over
            PlaceObjectAction::Replace(character_id) => {
                self.check_defined(display_list, position, depth, character_id)?;
                let previous = display_list.remove(position, depth)?;
                let mut placed = PlacedCharacter {
                    character_id,
                    ..previous
                };
                placed.apply(place);
                events.push(PlacementEvent::Remove { depth });
                events.push(PlacementEvent::Place {
                    depth,
                    character_id,
                    matrix: Some(placed.matrix),
                    color_transform: Some(placed.color_transform),
                    name: placed.name.clone(),
                    ratio: placed.ratio,
                    clip_depth: placed.clip_depth,
                    blend_mode: Some(placed.blend_mode),
                    is_visible: Some(placed.is_visible),
                });
                display_list.place(position, depth, placed)?;
            }
        }
        Ok(())
    }
}
