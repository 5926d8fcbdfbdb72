//! Macros for declaring machine states.

/// Declare a state enum and implement [`State`](crate::core::State) for it.
///
/// Each variant is paired with the name it is logged and persisted under;
/// the serde representation uses the same name so a checkpoint's `state`
/// field can be parsed back into the enum.
///
/// # Example
///
/// ```
/// use waymark::state_enum;
/// use waymark::core::State;
///
/// state_enum! {
///     pub enum RenderState {
///         Queued => "queued",
///         Rendering => "rendering",
///         Done => "done",
///         Broken => "broken",
///     }
///     terminal: [Done, Broken]
///     error: [Broken]
/// }
///
/// assert_eq!(RenderState::Rendering.name(), "rendering");
/// assert!(RenderState::Broken.is_terminal());
/// assert_eq!(RenderState::ALL.len(), 4);
/// ```
#[macro_export]
macro_rules! state_enum {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $(
                $(#[$variant_meta:meta])*
                $variant:ident => $label:literal
            ),* $(,)?
        }

        $(terminal: [$($terminal:ident),* $(,)?])?
        $(error: [$($error:ident),* $(,)?])?
    ) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, serde::Serialize, serde::Deserialize)]
        $vis enum $name {
            $(
                $(#[$variant_meta])*
                #[serde(rename = $label)]
                $variant
            ),*
        }

        impl $name {
            /// Every declared state, in declaration order.
            #[allow(dead_code)]
            pub const ALL: &'static [Self] = &[$(Self::$variant),*];
        }

        impl $crate::core::State for $name {
            fn name(&self) -> &str {
                match self {
                    $(Self::$variant => $label),*
                }
            }

            #[allow(unreachable_patterns)]
            fn is_terminal(&self) -> bool {
                match self {
                    $($(Self::$terminal => true,)*)?
                    _ => false,
                }
            }

            #[allow(unreachable_patterns)]
            fn is_error(&self) -> bool {
                match self {
                    $($(Self::$error => true,)*)?
                    _ => false,
                }
            }
        }

        impl ::std::fmt::Display for $name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                f.write_str($crate::core::State::name(self))
            }
        }
    };
}
