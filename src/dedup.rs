//! Collapse regions that several pathways found for the same symbol.

use crate::config::DedupConfig;
use crate::models::{PathwaySet, RefinedRegion, RegionState, ResolvedRegion};

/// Union-Find data structure
pub struct UnionFind {
    parent: Vec<u32>,
}

impl UnionFind {
    /// `n` singleton sets
    pub fn new(n: usize) -> Self {
        Self {
            parent: (0..n as u32).collect(),
        }
    }

    /// Root of `x`, compressing the path
    pub fn find(&mut self, x: u32) -> u32 {
        if self.parent[x as usize] != x {
            self.parent[x as usize] = self.find(self.parent[x as usize]);
        }
        self.parent[x as usize]
    }

    /// Merge the sets holding `x` and `y`
    pub fn union(&mut self, x: u32, y: u32) {
        let root_x = self.find(x);
        let root_y = self.find(y);
        if root_x != root_y {
            self.parent[root_x as usize] = root_y;
        }
    }
}

/// Groups overlapping regions and keeps one representative per group
#[derive(Debug, Clone, Default)]
pub struct DuplicateResolver {
    config: DedupConfig,
}

impl DuplicateResolver {
    /// Resolver with the given thresholds
    pub fn new(config: DedupConfig) -> Self {
        Self { config }
    }

    /// Two regions describe the same symbol when their bounding boxes overlap
    /// enough or their centroids nearly coincide.
    ///
    /// A region without a real location is never linked; its frame-sized
    /// quad says nothing about which symbol it read.
    pub fn linked(&self, a: &RefinedRegion, b: &RefinedRegion) -> bool {
        if !a.located || !b.located {
            return false;
        }
        a.bbox.iou(&b.bbox) >= self.config.iou_threshold
            || a.quad.centroid().distance(&b.quad.centroid()) < self.config.centroid_distance
    }

    /// Partition into connected components of the overlap graph.
    ///
    /// Each component keeps its highest-authority member (larger area breaks
    /// ties, then input order) with the union of all members' pathways and
    /// any immediate read found in the component.
    pub fn resolve(&self, regions: Vec<RefinedRegion>) -> Vec<ResolvedRegion> {
        let n = regions.len();
        let mut uf = UnionFind::new(n);
        for i in 0..n {
            for j in (i + 1)..n {
                if self.linked(&regions[i], &regions[j]) {
                    uf.union(i as u32, j as u32);
                }
            }
        }

        let mut components: Vec<Vec<usize>> = Vec::new();
        let mut root_slot: Vec<Option<usize>> = vec![None; n];
        for i in 0..n {
            let root = uf.find(i as u32) as usize;
            match root_slot[root] {
                Some(slot) => components[slot].push(i),
                None => {
                    root_slot[root] = Some(components.len());
                    components.push(vec![i]);
                }
            }
        }

        let mut slots: Vec<Option<RefinedRegion>> = regions.into_iter().map(Some).collect();
        let mut resolved = Vec::with_capacity(components.len());
        for members in components {
            let Some(rep_idx) = members.iter().copied().reduce(|best, i| {
                let (a, b) = (slots[best].as_ref(), slots[i].as_ref());
                match (a, b) {
                    (Some(a), Some(b)) if outranks(b, a) => i,
                    _ => best,
                }
            }) else {
                continue;
            };

            let pathways = members
                .iter()
                .filter_map(|&i| slots[i].as_ref())
                .fold(PathwaySet::default(), |acc, r| acc.union(r.pathways));
            let immediate = members
                .iter()
                .filter_map(|&i| slots[i].as_ref())
                .find_map(|r| r.immediate.clone());

            let Some(mut region) = slots[rep_idx].take() else {
                continue;
            };
            region.pathways = pathways;
            if region.immediate.is_none() && immediate.is_some() {
                region.immediate = immediate;
                region.state = RegionState::FastDecoded;
            }
            if region.state == RegionState::Refined {
                region.transition(RegionState::Deduplicated);
            }
            resolved.push(ResolvedRegion {
                region,
                merged: members.len(),
            });
        }

        log::debug!("dedup: {n} regions -> {} symbols", resolved.len());
        resolved
    }

    /// Drop undecoded regions implausibly small or large for a symbol
    pub fn retain_plausible(&self, regions: &mut Vec<ResolvedRegion>, width: u32, height: u32) {
        let image_area = width as f32 * height as f32;
        let min = image_area * self.config.min_area_fraction;
        let max = image_area * self.config.max_area_fraction;
        let before = regions.len();
        regions.retain(|r| {
            let area = r.region.area();
            r.region.immediate.is_some() || (min..=max).contains(&area)
        });
        if regions.len() != before {
            log::debug!("dropped {} implausible regions", before - regions.len());
        }
    }
}

fn outranks(a: &RefinedRegion, b: &RefinedRegion) -> bool {
    (a.authority(), a.area()) > (b.authority(), b.area())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::SymbolRead;
    use crate::models::{BoundingBox, CodeType, Pathway, Quad};
    use image::GrayImage;

    fn region(x: f32, y: f32, w: f32, h: f32, pathway: Pathway) -> RefinedRegion {
        let bbox = BoundingBox {
            min_x: x,
            min_y: y,
            max_x: x + w,
            max_y: y + h,
        };
        RefinedRegion {
            quad: Quad::from_bbox(&bbox),
            bbox,
            pathways: PathwaySet::single(pathway),
            crop: GrayImage::new(1, 1),
            immediate: None,
            located: true,
            state: RegionState::Refined,
        }
    }

    #[test]
    fn test_union_find() {
        let mut uf = UnionFind::new(5);
        uf.union(0, 1);
        uf.union(3, 4);
        uf.union(1, 4);
        assert_eq!(uf.find(0), uf.find(3));
        assert_ne!(uf.find(2), uf.find(0));
    }

    #[test]
    fn test_high_overlap_collapses_to_higher_authority() {
        // IoU of these two boxes is 0.6
        let gradient = region(0.0, 0.0, 100.0, 100.0, Pathway::Gradient);
        let edge = region(25.0, 0.0, 100.0, 100.0, Pathway::Edge);
        assert!((gradient.bbox.iou(&edge.bbox) - 0.6).abs() < 1e-6);

        let resolved = DuplicateResolver::default().resolve(vec![gradient, edge]);
        assert_eq!(resolved.len(), 1);
        let rep = &resolved[0];
        assert_eq!(rep.merged, 2);
        assert_eq!(rep.region.bbox.min_x, 25.0);
        assert!(rep.region.pathways.contains(Pathway::Gradient));
        assert!(rep.region.pathways.contains(Pathway::Edge));
        assert_eq!(rep.region.state, RegionState::Deduplicated);
    }

    #[test]
    fn test_chain_is_transitive() {
        let resolver = DuplicateResolver::default();
        let regions = vec![
            region(0.0, 0.0, 50.0, 50.0, Pathway::Edge),
            region(30.0, 0.0, 50.0, 50.0, Pathway::Edge),
            region(60.0, 0.0, 50.0, 50.0, Pathway::Edge),
        ];
        assert!(!resolver.linked(&regions[0], &regions[2]));
        assert_eq!(resolver.resolve(regions).len(), 1);
    }

    #[test]
    fn test_disjoint_regions_stay_apart() {
        let resolved = DuplicateResolver::default().resolve(vec![
            region(0.0, 0.0, 40.0, 40.0, Pathway::Edge),
            region(200.0, 0.0, 40.0, 40.0, Pathway::Edge),
        ]);
        assert_eq!(resolved.len(), 2);
    }

    #[test]
    fn test_direct_wins_and_keeps_read() {
        let mut direct = region(10.0, 10.0, 60.0, 60.0, Pathway::Direct);
        direct.state = RegionState::FastDecoded;
        direct.immediate = Some(SymbolRead {
            code_type: CodeType::Qr,
            payload: "hello".into(),
            points: Vec::new(),
        });
        let finder = region(8.0, 8.0, 70.0, 70.0, Pathway::QrFinder);
        let resolved = DuplicateResolver::default().resolve(vec![finder, direct]);
        assert_eq!(resolved.len(), 1);
        let rep = &resolved[0].region;
        assert_eq!(rep.bbox.min_x, 10.0);
        assert_eq!(rep.state, RegionState::FastDecoded);
        assert_eq!(rep.immediate.as_ref().unwrap().payload, "hello");
    }

    #[test]
    fn test_retain_plausible() {
        let resolver = DuplicateResolver::default();
        let mut regions = resolver.resolve(vec![
            region(0.0, 0.0, 2.0, 2.0, Pathway::Edge),
            region(100.0, 100.0, 50.0, 50.0, Pathway::Edge),
            region(0.0, 0.0, 999.0, 999.0, Pathway::Gradient),
        ]);
        assert_eq!(regions.len(), 3);
        resolver.retain_plausible(&mut regions, 1000, 1000);
        assert_eq!(regions.len(), 1);
        assert_eq!(regions[0].region.bbox.min_x, 100.0);
    }

    #[test]
    fn test_unlocated_direct_read_keeps_other_symbols() {
        let mut direct = region(0.0, 0.0, 299.0, 299.0, Pathway::Direct);
        direct.located = false;
        direct.state = RegionState::FastDecoded;
        direct.immediate = Some(SymbolRead {
            code_type: CodeType::Qr,
            payload: "qr".into(),
            points: Vec::new(),
        });
        let edge = region(90.0, 75.0, 120.0, 150.0, Pathway::Edge);

        let resolver = DuplicateResolver::default();
        assert!(!resolver.linked(&direct, &edge));
        let resolved = resolver.resolve(vec![direct, edge]);
        assert_eq!(resolved.len(), 2);
        assert!(resolved.iter().any(|r| r.region.immediate.is_some()));
        assert!(resolved.iter().any(|r| r.region.pathways.contains(Pathway::Edge)
            && r.region.immediate.is_none()));
    }

    #[test]
    fn test_resolved_regions_are_pairwise_unlinked() {
        // Deterministic LCG so the layout is reproducible
        let mut state = 0x2545_f491_u64;
        let mut next = |range: f32| {
            state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            (state >> 33) as f32 / (1u64 << 31) as f32 * range
        };
        let pathways = [Pathway::Direct, Pathway::QrFinder, Pathway::Edge, Pathway::Gradient];

        let resolver = DuplicateResolver::default();
        for round in 0..20 {
            let regions: Vec<RefinedRegion> = (0..40)
                .map(|i| {
                    let (w, h) = (10.0 + next(90.0), 10.0 + next(90.0));
                    region(next(500.0), next(500.0), w, h, pathways[(i + round) % 4])
                })
                .collect();
            let resolved = resolver.resolve(regions);
            for (i, a) in resolved.iter().enumerate() {
                for b in &resolved[i + 1..] {
                    let (a, b) = (&a.region, &b.region);
                    assert!(a.bbox.iou(&b.bbox) < 0.15, "round {round}: {:?} {:?}", a.bbox, b.bbox);
                    assert!(a.quad.centroid().distance(&b.quad.centroid()) >= 15.0);
                }
            }
        }
    }
}
