//! 超像素连通性约束.

use ndarray::Array3;

use super::cluster::UNASSIGNED;
use crate::consts::label::START_LABEL;
use crate::Idx3d;

/// 钻石 (6-) 邻域偏移.
const DIAMOND: [(isize, isize, isize); 6] = [
    (1, 0, 0),
    (-1, 0, 0),
    (0, 1, 0),
    (0, -1, 0),
    (0, 0, 1),
    (0, 0, -1),
];

/// `pos + d`, 越界时返回 `None`.
#[inline]
fn offset((x, y, z): Idx3d, (dx, dy, dz): (isize, isize, isize), (nx, ny, nz): Idx3d) -> Option<Idx3d> {
    let x = x.checked_add_signed(dx).filter(|v| *v < nx)?;
    let y = y.checked_add_signed(dy).filter(|v| *v < ny)?;
    let z = z.checked_add_signed(dz).filter(|v| *v < nz)?;
    Some((x, y, z))
}

/// 按扫描序对聚类结果做 6-连通广度优先重标记, 保证每个标签是单个连通分量.
///
/// 1. 同一聚类的不连通部分获得不同标签;
/// 2. 单个分量最多 `max_size` 个体素, 超出部分在之后另起新标签;
/// 3. 小于 `min_size` 的分量并入与其相邻的、已标记的分量;
///   没有这样的邻居时保留为独立标签;
/// 4. 未分配体素 ([`UNASSIGNED`]) 的标签为 0.
///
/// 返回的标签从 `START_LABEL` 开始连续编号.
pub(crate) fn enforce_connectivity(
    clusters: &Array3<usize>,
    min_size: usize,
    max_size: usize,
) -> Array3<u32> {
    let dim = clusters.dim();
    let max_size = max_size.max(1);
    let mut labels = Array3::<u32>::zeros(dim);
    let mut next = START_LABEL;
    let mut component: Vec<Idx3d> = Vec::with_capacity(max_size);

    for (seed, &cluster) in clusters.indexed_iter() {
        if cluster == UNASSIGNED || labels[seed] != 0 {
            continue;
        }

        let mut adjacent = None;
        labels[seed] = next;
        component.clear();
        component.push(seed);

        let mut visited = 0;
        'bfs: while visited < component.len() && component.len() < max_size {
            let pos = component[visited];
            for d in DIAMOND {
                let Some(n) = offset(pos, d, dim) else {
                    continue;
                };
                if clusters[n] == cluster && labels[n] == 0 {
                    labels[n] = next;
                    component.push(n);
                    if component.len() >= max_size {
                        break 'bfs;
                    }
                } else if labels[n] != 0 && labels[n] != next {
                    adjacent = Some(labels[n]);
                }
            }
            visited += 1;
        }

        match adjacent {
            Some(adj) if component.len() < min_size => {
                component.iter().for_each(|p| labels[*p] = adj);
            }
            _ => next += 1,
        }
    }
    labels
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_disconnected_cluster() {
        // 同一聚类 0 被聚类 1 隔开.
        let clusters = Array3::from_shape_fn((5, 1, 1), |(x, _, _)| usize::from(x == 2));
        let labels = enforce_connectivity(&clusters, 0, 100);
        assert_eq!(labels.iter().copied().collect::<Vec<_>>(), [1, 1, 2, 3, 3]);
    }

    #[test]
    fn test_small_component_merged() {
        let clusters = Array3::from_shape_fn((6, 1, 1), |(x, _, _)| usize::from(x == 3));
        let labels = enforce_connectivity(&clusters, 2, 100);
        // 单体素分量并入左侧已标记的分量; 右侧分量另起标签.
        assert_eq!(labels.iter().copied().collect::<Vec<_>>(), [1, 1, 1, 1, 2, 2]);
    }

    #[test]
    fn test_isolated_small_component_kept() {
        let mut clusters = Array3::from_elem((3, 3, 3), UNASSIGNED);
        clusters[(1, 1, 1)] = 0;
        let labels = enforce_connectivity(&clusters, 5, 100);
        assert_eq!(labels[(1, 1, 1)], 1);
        assert_eq!(labels.iter().filter(|l| **l == 0).count(), 26);
    }

    #[test]
    fn test_max_size_caps_component() {
        let clusters = Array3::<usize>::zeros((6, 1, 1));
        let labels = enforce_connectivity(&clusters, 0, 4);
        assert_eq!(labels.iter().copied().collect::<Vec<_>>(), [1, 1, 1, 1, 2, 2]);
    }

    #[test]
    fn test_offset_bounds() {
        assert_eq!(offset((0, 0, 0), (-1, 0, 0), (2, 2, 2)), None);
        assert_eq!(offset((1, 1, 1), (1, 0, 0), (2, 2, 2)), None);
        assert_eq!(offset((1, 1, 1), (0, -1, 0), (2, 2, 2)), Some((1, 0, 1)));
    }
}
