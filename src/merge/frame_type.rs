use crate::capture::Encapsulation;

/// Picks the output encapsulation: the inputs' common type, or the
/// per-record sentinel when any input disagrees with the first.
pub fn select_frame_type<I>(encapsulations: I) -> Encapsulation
where
    I: IntoIterator<Item = Encapsulation>,
{
    let mut encapsulations = encapsulations.into_iter();
    let candidate = match encapsulations.next() {
        Some(first) => first,
        None => return Encapsulation::UNKNOWN,
    };

    if encapsulations.any(|e| e != candidate) {
        Encapsulation::PER_RECORD
    } else {
        candidate
    }
}
