//! Region lifecycle types shared by detection, refinement and recognition.

use image::GrayImage;
use serde::ser::{Serialize, SerializeSeq, Serializer};

use super::{BoundingBox, Point, Quad};
use crate::decode::SymbolRead;

/// Independent strategy that proposes symbol regions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize)]
pub enum Pathway {
    /// Whole-image decode with decoder-reported location
    Direct,
    /// Canny edges and morphological closing
    Edge,
    /// Gradient magnitude with directional closing
    Gradient,
    /// QR finder pattern triples
    QrFinder,
}

impl Pathway {
    /// All pathways in run order
    pub const ALL: [Pathway; 4] = [
        Pathway::Direct,
        Pathway::QrFinder,
        Pathway::Edge,
        Pathway::Gradient,
    ];

    /// Precedence when several pathways claim the same symbol
    pub fn authority(self) -> u8 {
        match self {
            Pathway::Direct => 3,
            Pathway::QrFinder | Pathway::Edge => 2,
            Pathway::Gradient => 1,
        }
    }

    fn bit(self) -> u8 {
        match self {
            Pathway::Direct => 1,
            Pathway::Edge => 1 << 1,
            Pathway::Gradient => 1 << 2,
            Pathway::QrFinder => 1 << 3,
        }
    }

    /// Stable lower-case name
    pub fn name(self) -> &'static str {
        match self {
            Pathway::Direct => "direct",
            Pathway::Edge => "edge",
            Pathway::Gradient => "gradient",
            Pathway::QrFinder => "qr_finder",
        }
    }
}

/// Small set of pathways
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct PathwaySet(u8);

impl PathwaySet {
    /// Set holding one pathway
    pub fn single(pathway: Pathway) -> Self {
        Self(pathway.bit())
    }

    /// Add a pathway
    pub fn insert(&mut self, pathway: Pathway) {
        self.0 |= pathway.bit();
    }

    /// Membership test
    pub fn contains(&self, pathway: Pathway) -> bool {
        self.0 & pathway.bit() != 0
    }

    /// Union of both sets
    pub fn union(self, other: PathwaySet) -> Self {
        Self(self.0 | other.0)
    }

    /// True when no pathway is recorded
    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// Members in run order
    pub fn iter(&self) -> impl Iterator<Item = Pathway> + '_ {
        Pathway::ALL.into_iter().filter(|p| self.contains(*p))
    }

    /// Highest authority among the members
    pub fn authority(&self) -> u8 {
        self.iter().map(Pathway::authority).max().unwrap_or(0)
    }
}

impl Serialize for PathwaySet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(None)?;
        for p in self.iter() {
            seq.serialize_element(p.name())?;
        }
        seq.end()
    }
}

/// Where a region is in its lifecycle.
///
/// ```text
/// Pending -> FastDecoded -> Validated
///                 \-> Deduplicated (payload rejected)
/// Pending -> CandidateFound -> Refined -> Deduplicated -> Recognized | Unrecognized
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegionState {
    /// Nothing known yet
    Pending,
    /// Read during whole-image decoding
    FastDecoded,
    /// Immediate read accepted
    Validated,
    /// Proposed by a localization pathway
    CandidateFound,
    /// Quad fitted and crop rectified
    Refined,
    /// Survived duplicate resolution
    Deduplicated,
    /// Read and accepted during recognition
    Recognized,
    /// Every orientation and enhancement failed
    Unrecognized,
}

impl RegionState {
    /// Whether `self -> next` is a legal step
    pub fn can_advance_to(self, next: RegionState) -> bool {
        use RegionState::*;
        matches!(
            (self, next),
            (Pending, FastDecoded)
                | (Pending, CandidateFound)
                | (FastDecoded, Validated)
                | (FastDecoded, Deduplicated)
                | (CandidateFound, Refined)
                | (Refined, Deduplicated)
                | (Deduplicated, Recognized)
                | (Deduplicated, Unrecognized)
        )
    }

    /// Step to `next`, `None` when the step is illegal
    pub fn advance(self, next: RegionState) -> Option<RegionState> {
        self.can_advance_to(next).then_some(next)
    }

    /// Final states
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            RegionState::Validated | RegionState::Recognized | RegionState::Unrecognized
        )
    }
}

/// Region proposed by one pathway, in original image coordinates
#[derive(Debug, Clone)]
pub struct RawCandidate {
    /// Outline (contour or quad)
    pub polygon: Vec<Point>,
    /// Pathway that proposed it
    pub pathway: Pathway,
    /// Scale of the variant it was found on
    pub scale: f32,
    /// Read obtained while locating the region
    pub immediate: Option<SymbolRead>,
    /// False when the outline is a stand-in for a read without a location
    pub located: bool,
    /// Lifecycle state
    pub state: RegionState,
}

impl RawCandidate {
    /// Map `polygon` from variant coordinates back to the original image.
    ///
    /// Points are clamped into the `width x height` frame. Returns `None`
    /// when fewer than three points remain or the enclosed area is zero.
    pub fn from_scaled(
        polygon: &[Point],
        pathway: Pathway,
        scale: f32,
        width: u32,
        height: u32,
    ) -> Option<Self> {
        if polygon.len() < 3 || scale <= 0.0 {
            return None;
        }
        let max_x = width.saturating_sub(1) as f32;
        let max_y = height.saturating_sub(1) as f32;
        let mapped: Vec<Point> = polygon
            .iter()
            .map(|p| p.scale(1.0 / scale).clamp(max_x, max_y))
            .collect();
        if super::polygon_area(&mapped) <= 0.0 {
            return None;
        }
        Some(Self {
            polygon: mapped,
            pathway,
            scale,
            immediate: None,
            located: true,
            state: RegionState::CandidateFound,
        })
    }

    /// Attach a whole-image read
    pub fn with_read(mut self, read: SymbolRead) -> Self {
        self.immediate = Some(read);
        self.state = RegionState::FastDecoded;
        self
    }

    /// Mark the outline as covering the frame rather than the symbol
    pub fn unlocated(mut self) -> Self {
        self.located = false;
        self
    }

    /// Axis-aligned bounds of the outline
    pub fn bbox(&self) -> BoundingBox {
        BoundingBox::from_points(&self.polygon).unwrap_or_default()
    }
}

/// Candidate after quad fitting and rectification
#[derive(Debug, Clone)]
pub struct RefinedRegion {
    /// Fitted quad in original image coordinates
    pub quad: Quad,
    /// Bounds of `quad`
    pub bbox: BoundingBox,
    /// Pathways that proposed it
    pub pathways: PathwaySet,
    /// Rectified crop
    pub crop: GrayImage,
    /// Read obtained while locating the region
    pub immediate: Option<SymbolRead>,
    /// Whether `quad` is the symbol's actual location
    pub located: bool,
    /// Lifecycle state
    pub state: RegionState,
}

impl RefinedRegion {
    /// Highest pathway authority
    pub fn authority(&self) -> u8 {
        self.pathways.authority()
    }

    /// Quad area
    pub fn area(&self) -> f32 {
        self.quad.area()
    }

    /// Move to `next`, leaving the state alone on an illegal step
    pub fn transition(&mut self, next: RegionState) -> bool {
        match self.state.advance(next) {
            Some(state) => {
                self.state = state;
                true
            }
            None => {
                log::warn!("illegal region transition {:?} -> {:?}", self.state, next);
                false
            }
        }
    }
}

/// Representative of one physical symbol after duplicate resolution
#[derive(Debug, Clone)]
pub struct ResolvedRegion {
    /// Representative region with merged pathways
    pub region: RefinedRegion,
    /// Number of candidates folded into it
    pub merged: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pathway_authority() {
        assert!(Pathway::Direct.authority() > Pathway::QrFinder.authority());
        assert_eq!(Pathway::QrFinder.authority(), Pathway::Edge.authority());
        assert!(Pathway::Edge.authority() > Pathway::Gradient.authority());
    }

    #[test]
    fn test_pathway_set() {
        let mut set = PathwaySet::single(Pathway::Gradient);
        assert!(!set.contains(Pathway::Edge));
        set.insert(Pathway::Edge);
        assert_eq!(set.authority(), 2);
        let merged = set.union(PathwaySet::single(Pathway::Direct));
        assert_eq!(
            merged.iter().collect::<Vec<_>>(),
            vec![Pathway::Direct, Pathway::Edge, Pathway::Gradient]
        );
        assert_eq!(
            serde_json::to_string(&merged).unwrap(),
            r#"["direct","edge","gradient"]"#
        );
    }

    #[test]
    fn test_state_machine() {
        use RegionState::*;
        assert_eq!(Pending.advance(FastDecoded), Some(FastDecoded));
        assert_eq!(FastDecoded.advance(Validated), Some(Validated));
        assert_eq!(Refined.advance(Deduplicated), Some(Deduplicated));
        assert_eq!(Pending.advance(Recognized), None);
        assert_eq!(Validated.advance(Recognized), None);
        assert!(Unrecognized.is_terminal());
        assert!(!Deduplicated.is_terminal());
    }

    #[test]
    fn test_candidate_from_scaled() {
        let pts = [
            Point::new(10.0, 10.0),
            Point::new(50.0, 10.0),
            Point::new(50.0, 30.0),
            Point::new(10.0, 30.0),
        ];
        let c = RawCandidate::from_scaled(&pts, Pathway::Edge, 0.5, 1000, 1000).unwrap();
        assert_eq!(c.polygon[2], Point::new(100.0, 60.0));
        assert_eq!(c.state, RegionState::CandidateFound);
        assert!(c.located);
        assert!(!c.unlocated().located);

        // collapses after clamping into a 5x5 frame
        assert!(RawCandidate::from_scaled(&pts, Pathway::Edge, 0.1, 5, 5).is_none());
    }
}
