/// Compile a literal regex once and hand out a `&'static Regex`.
#[macro_export]
macro_rules! regex {
    ($pat:literal) => {{
        static RE: once_cell::sync::Lazy<regex::Regex> =
            once_cell::sync::Lazy::new(|| regex::Regex::new($pat).expect("static regex literal"));
        &*RE
    }};
}

/// Build a `Vec<Size>` from `[w, h]` pairs.
///
/// ```
/// use placement_engine::{Size, sizes};
///
/// assert_eq!(sizes![[300, 250], [728, 90]], vec![Size(300, 250), Size(728, 90)]);
/// ```
#[macro_export]
macro_rules! sizes {
    ($([$w:expr, $h:expr]),* $(,)?) => {
        vec![ $($crate::Size($w, $h)),* ]
    };
}
