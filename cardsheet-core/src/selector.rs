use crate::region::RawBox;

/// Pick the face to crop: always the first one reported.
///
/// No ranking by size, score or position happens here.
pub fn select_first(faces: &[RawBox]) -> Option<RawBox> {
    faces.first().copied()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_face_wins_even_when_smaller() {
        let faces = [RawBox::new(300, 10, 20, 20), RawBox::new(0, 0, 400, 400)];
        assert_eq!(select_first(&faces), Some(RawBox::new(300, 10, 20, 20)));
    }

    #[test]
    fn no_faces_selects_nothing() {
        assert_eq!(select_first(&[]), None);
    }
}
