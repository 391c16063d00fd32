use tinyc_utils::Idx;

macro_rules! new_id {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(usize);

        impl Idx for $name {
            fn new(idx: usize) -> Self {
                $name(idx)
            }

            fn idx(&self) -> usize {
                self.0
            }

            fn incr(&mut self) {
                self.0 += 1;
            }

            fn incr_by(&mut self, by: usize) {
                self.0 += by;
            }
        }
    };
}

new_id!(StructId);
new_id!(FuncId);
new_id!(GlobalId);
new_id!(Local);
