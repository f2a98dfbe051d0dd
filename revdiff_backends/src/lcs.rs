//! Linear-space longest common subsequence (Hirschberg).

use revdiff_backend_api::EditBlock;

/// Index pairs `(i, j)` with `a[i] == b[j]` forming a longest common
/// subsequence, in increasing order on both sides.
pub(crate) fn matched_pairs<T: PartialEq>(a: &[T], b: &[T]) -> Vec<(usize, usize)> {
    let prefix = common_prefix(a, b);
    let suffix = common_prefix_rev(&a[prefix..], &b[prefix..]);

    let mut pairs: Vec<(usize, usize)> = (0..prefix).map(|i| (i, i)).collect();
    hirschberg(
        &a[prefix..a.len() - suffix],
        prefix,
        &b[prefix..b.len() - suffix],
        prefix,
        &mut pairs,
    );
    let (a_tail, b_tail) = (a.len() - suffix, b.len() - suffix);
    pairs.extend((0..suffix).map(|k| (a_tail + k, b_tail + k)));
    pairs
}

fn hirschberg<T: PartialEq>(
    a: &[T],
    a_offset: usize,
    b: &[T],
    b_offset: usize,
    out: &mut Vec<(usize, usize)>,
) {
    if a.is_empty() || b.is_empty() {
        return;
    }
    if a.len() == 1 {
        if let Some(j) = b.iter().position(|item| *item == a[0]) {
            out.push((a_offset, b_offset + j));
        }
        return;
    }

    let mid = a.len() / 2;
    let forward = prefix_lengths(&a[..mid], b);
    let backward = suffix_lengths(&a[mid..], b);

    let mut split = 0;
    let mut best = 0;
    for j in 0..=b.len() {
        let total = forward[j] + backward[j];
        if total > best {
            best = total;
            split = j;
        }
    }

    hirschberg(&a[..mid], a_offset, &b[..split], b_offset, out);
    hirschberg(&a[mid..], a_offset + mid, &b[split..], b_offset + split, out);
}

/// `out[j]` = LCS length of `a` and `b[..j]`.
fn prefix_lengths<T: PartialEq>(a: &[T], b: &[T]) -> Vec<usize> {
    let mut prev = vec![0; b.len() + 1];
    let mut cur = vec![0; b.len() + 1];
    for x in a {
        for (j, y) in b.iter().enumerate() {
            cur[j + 1] = if x == y {
                prev[j] + 1
            } else {
                cur[j].max(prev[j + 1])
            };
        }
        std::mem::swap(&mut prev, &mut cur);
    }
    prev
}

/// `out[j]` = LCS length of `a` and `b[j..]`.
fn suffix_lengths<T: PartialEq>(a: &[T], b: &[T]) -> Vec<usize> {
    let n = b.len();
    let mut prev = vec![0; n + 1];
    let mut cur = vec![0; n + 1];
    for x in a.iter().rev() {
        for j in (0..n).rev() {
            cur[j] = if *x == b[j] {
                prev[j + 1] + 1
            } else {
                cur[j + 1].max(prev[j])
            };
        }
        std::mem::swap(&mut prev, &mut cur);
    }
    prev
}

/// Edit script aligning `old` against `new` along a longest common subsequence.
///
/// This alignment is canonical: every in-process backend reports the lines it
/// marks as changed by this script, so they all agree line for line.
pub(crate) fn edit_script<'a>(old: &[&'a str], new: &[&'a str]) -> Vec<EditBlock<'a>> {
    blocks_from_pairs(old, new, matched_pairs(old, new))
}

/// Realign a backend's script along the canonical alignment.
///
/// The script only bounds the region that is realigned: lines before its first
/// edit and after its last edit are taken as unchanged, clamped to the common
/// prefix and suffix of the inputs. Inside those clamps the region always
/// contains the whole trimmed middle, so the result equals [`edit_script`].
#[cfg_attr(not(feature = "libgit2"), allow(dead_code))]
pub(crate) fn canonicalize<'a>(
    old: &[&'a str],
    new: &[&'a str],
    blocks: &[EditBlock<'_>],
) -> Vec<EditBlock<'a>> {
    let Some(first) = blocks.iter().position(EditBlock::is_edit) else {
        return edit_script(old, new);
    };
    let last = blocks.iter().rposition(EditBlock::is_edit).unwrap_or(first);
    let lead: usize = blocks[..first].iter().map(|block| block.old.len()).sum();
    let trail: usize = blocks[last + 1..].iter().map(|block| block.old.len()).sum();

    let prefix = common_prefix(old, new);
    let suffix = common_prefix_rev(&old[prefix..], &new[prefix..]);
    let start = lead.min(prefix);
    let tail = trail.min(suffix);
    let (old_end, new_end) = (old.len() - tail, new.len() - tail);

    let mut pairs: Vec<(usize, usize)> = (0..start).map(|i| (i, i)).collect();
    pairs.extend(
        matched_pairs(&old[start..old_end], &new[start..new_end])
            .into_iter()
            .map(|(i, j)| (start + i, start + j)),
    );
    pairs.extend((0..tail).map(|k| (old_end + k, new_end + k)));
    blocks_from_pairs(old, new, pairs)
}

fn common_prefix<T: PartialEq>(a: &[T], b: &[T]) -> usize {
    a.iter().zip(b).take_while(|(x, y)| x == y).count()
}

fn common_prefix_rev<T: PartialEq>(a: &[T], b: &[T]) -> usize {
    a.iter()
        .rev()
        .zip(b.iter().rev())
        .take_while(|(x, y)| x == y)
        .count()
}

fn blocks_from_pairs<'a>(
    old: &[&'a str],
    new: &[&'a str],
    pairs: Vec<(usize, usize)>,
) -> Vec<EditBlock<'a>> {
    let mut blocks = Vec::new();
    let mut copied: Vec<&'a str> = Vec::new();
    let (mut i, mut j) = (0, 0);

    let end = (old.len(), new.len());
    for (oi, nj) in pairs.into_iter().chain(std::iter::once(end)) {
        if oi > i || nj > j {
            if !copied.is_empty() {
                blocks.push(EditBlock::copy(std::mem::take(&mut copied)));
            }
            if let Some(block) = EditBlock::replace(old[i..oi].to_vec(), new[j..nj].to_vec()) {
                blocks.push(block);
            }
        }
        if (oi, nj) != end {
            copied.push(old[oi]);
        }
        i = oi + 1;
        j = nj + 1;
    }

    if !copied.is_empty() {
        blocks.push(EditBlock::copy(copied));
    }
    blocks
}
